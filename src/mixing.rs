use std::collections::VecDeque;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::trace;

use crate::candidate::{CandidatePair, PairCharge, PairCuts};
use crate::config::{BinEdges, MixedBackground, MixingConfig};
use crate::track::Track;

/// Identifies the pool of events similar to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub centrality_bin: usize,
    pub vertex_bin: usize,
}

/// Centrality and vertex-z binning of the mixing pools.
#[derive(Debug, Clone, PartialEq)]
pub struct MixingBins {
    pub centrality: BinEdges,
    pub vertex: BinEdges,
}

impl MixingBins {
    pub fn classify(&self, centrality: Option<f64>, vertex_z: Option<f64>) -> Option<PoolKey> {
        //! The pool an event with this centrality and vertex belongs to, or [`None`] if either
        //! value is missing or outside its bin table.
        Some(PoolKey {
            centrality_bin: self.centrality.find(centrality?)?,
            vertex_bin: self.vertex.find(vertex_z?)?,
        })
    }
}

impl MixedBackground {
    pub fn keeps(&self, charge: PairCharge) -> bool {
        match self {
            Self::All => true,
            Self::UnlikeSign => charge == PairCharge::Unlike,
            Self::LikeSign => charge != PairCharge::Unlike,
        }
    }
}

/// Kaon candidates of past events sharing one [`PoolKey`], oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPool {
    events: VecDeque<Vec<Track>>,
    n_tracks: usize,
}

impl EventPool {
    pub fn n_events(&self) -> usize {
        self.events.len()
    }

    pub fn n_tracks(&self) -> usize {
        self.n_tracks
    }

    pub fn events(&self) -> impl Iterator<Item = &[Track]> {
        self.events.iter().map(Vec::as_slice)
    }

    fn push(&mut self, tracks: Vec<Track>, depth: usize) {
        self.n_tracks += tracks.len();
        self.events.push_back(tracks);
        while self.events.len() > depth {
            if let Some(evicted) = self.events.pop_front() {
                self.n_tracks -= evicted.len();
            }
        }
    }
}

/// Owns every mixing pool of an analysis.
#[derive(Debug, Clone)]
pub struct PoolManager {
    bins: MixingBins,
    pool_depth: usize,
    min_tracks: usize,
    min_events: usize,
    max_tracks_per_event: usize,
    background: MixedBackground,
    pools: IndexMap<PoolKey, EventPool>,
}

impl PoolManager {
    pub fn new(config: &MixingConfig) -> Self {
        Self {
            bins: MixingBins {
                centrality: config.centrality_bins.clone(),
                vertex: config.vertex_bins.clone(),
            },
            pool_depth: config.pool_depth.max(1),
            min_tracks: config.min_tracks,
            min_events: config.min_events,
            max_tracks_per_event: config.max_tracks_per_event,
            background: config.background,
            pools: IndexMap::new(),
        }
    }

    pub fn classify(&self, centrality: Option<f64>, vertex_z: Option<f64>) -> Option<PoolKey> {
        self.bins.classify(centrality, vertex_z)
    }

    pub fn pool(&self, key: PoolKey) -> Option<&EventPool> {
        self.pools.get(&key)
    }

    pub fn n_pools(&self) -> usize {
        self.pools.len()
    }

    pub fn push(&mut self, key: PoolKey, mut tracks: Vec<Track>) {
        //! Buffer an event's kaon candidates, evicting the oldest event once the pool is deeper
        //! than the configured depth. Empty events are not buffered and lists longer than the
        //! per-event limit are truncated; a list truncated to nothing is not buffered either.
        tracks.truncate(self.max_tracks_per_event);
        if tracks.is_empty() {
            return;
        }
        let depth = self.pool_depth;
        let pool = self.pools.entry(key).or_default();
        pool.push(tracks, depth);
        trace!(
            ?key,
            events = pool.n_events(),
            tracks = pool.n_tracks(),
            "pushed event into mixing pool"
        );
    }

    pub fn is_ready(&self, key: PoolKey) -> bool {
        //! `true` once the pool holds enough events and enough tracks to be mixed. A key that
        //! has never been pushed to counts as an empty pool.
        let (events, tracks) = self
            .pools
            .get(&key)
            .map_or((0, 0), |pool| (pool.n_events(), pool.n_tracks()));
        events >= self.min_events && tracks >= self.min_tracks
    }

    pub fn mix(&self, current: &[Track], key: PoolKey, cuts: &PairCuts) -> Vec<CandidatePair> {
        //! Pair every current track with every buffered track of the pool. The pool is only read,
        //! so calling this twice on the same state gives the same pairs in the same order. Only the
        //! charge combinations of the configured background are kept.
        let Some(pool) = self.pools.get(&key) else {
            return Vec::new();
        };
        if current.is_empty() {
            return Vec::new();
        }
        let background = self.background;
        let per_event: Vec<Vec<CandidatePair>> = pool
            .events
            .par_iter()
            .map(|buffered| {
                buffered
                    .iter()
                    .flat_map(move |old| {
                        current
                            .iter()
                            .filter_map(move |new| cuts.combine(new, old))
                            .filter(move |pair| background.keeps(pair.charge))
                    })
                    .collect()
            })
            .collect();
        per_event.into_iter().flatten().collect()
    }

    pub fn reset(&mut self) {
        self.pools.clear();
    }
}

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::{debug, info, trace};

use crate::candidate::{CandidatePair, PairCharge, PairCuts};
use crate::config::{AnalysisConfig, BinEdges, EventCuts, MassBinning};
use crate::flow::{FlowCandidate, FlowCandidateSelector, FlowProfiles};
use crate::histogram::{Binning, Histogram1D};
use crate::mixing::PoolManager;
use crate::pid::{KaonSelector, PidResponse};
use crate::qa::TrackQa;
use crate::track::{Event, Track};

/// Whether a pair combines tracks from the same event or from a mixed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairOrigin {
    SameEvent,
    Mixed,
}

/// Key of one invariant-mass histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MassKey {
    pub centrality_class: usize,
    pub charge: PairCharge,
    pub origin: PairOrigin,
}

impl MassKey {
    pub fn name(&self) -> String {
        //! Histogram name in the form `InvM_NP_cen3` or `InvM_NP_mix_cen3`.
        let mix = match self.origin {
            PairOrigin::SameEvent => "",
            PairOrigin::Mixed => "mix_",
        };
        format!(
            "InvM_{}_{}cen{}",
            self.charge.label(),
            mix,
            self.centrality_class
        )
    }
}

/// Invariant-mass histograms keyed by centrality class, charge class and pair origin.
///
/// Histograms are created on first fill with a shared binning.
#[derive(Debug, Clone)]
pub struct MassHistograms {
    binning: Binning,
    histograms: IndexMap<MassKey, Histogram1D>,
}

impl MassHistograms {
    pub fn new(mass: &MassBinning) -> Self {
        Self {
            binning: Binning::linear(mass.bins, mass.min, mass.max),
            histograms: IndexMap::new(),
        }
    }

    pub fn score(&mut self, pair: &CandidatePair, centrality_class: usize, mixed: bool) -> usize {
        //! Deposit the pair's mass and return the bin it landed in. Masses outside the binning are
        //! clipped into the first or last bin.
        let key = MassKey {
            centrality_class,
            charge: pair.charge,
            origin: if mixed {
                PairOrigin::Mixed
            } else {
                PairOrigin::SameEvent
            },
        };
        let binning = &self.binning;
        self.histograms
            .entry(key)
            .or_insert_with(|| Histogram1D::new(binning.clone()))
            .fill(pair.mass)
    }

    pub fn get(&self, key: &MassKey) -> Option<&Histogram1D> {
        self.histograms.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MassKey, &Histogram1D)> {
        self.histograms.iter()
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

/// Transverse-momentum spectra of selected kaons per centrality class and charge sign.
#[derive(Debug, Clone)]
pub struct KaonSpectra {
    binning: Binning,
    positive: IndexMap<usize, Histogram1D>,
    negative: IndexMap<usize, Histogram1D>,
}

impl KaonSpectra {
    fn new() -> Self {
        Self {
            binning: Binning::linear(100, 0.0, 10.0),
            positive: IndexMap::new(),
            negative: IndexMap::new(),
        }
    }

    fn fill(&mut self, track: &Track, centrality_class: usize) {
        let map = if track.charge() > 0 {
            &mut self.positive
        } else {
            &mut self.negative
        };
        let binning = &self.binning;
        map.entry(centrality_class)
            .or_insert_with(|| Histogram1D::new(binning.clone()))
            .fill(track.pt());
    }

    pub fn positive(&self, centrality_class: usize) -> Option<&Histogram1D> {
        self.positive.get(&centrality_class)
    }

    pub fn negative(&self, centrality_class: usize) -> Option<&Histogram1D> {
        self.negative.get(&centrality_class)
    }
}

/// Pair counts per charge class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairCounts {
    pub unlike: u64,
    pub like_positive: u64,
    pub like_negative: u64,
}

impl PairCounts {
    fn add(&mut self, charge: PairCharge) {
        match charge {
            PairCharge::Unlike => self.unlike += 1,
            PairCharge::LikePositive => self.like_positive += 1,
            PairCharge::LikeNegative => self.like_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.unlike + self.like_positive + self.like_negative
    }
}

/// Event and pair bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    pub events_seen: u64,
    pub rejected_vertex: u64,
    pub rejected_centrality: u64,
    pub processed: u64,
    /// Processed events that fell outside the mixing bins.
    pub unpooled: u64,
    /// Processed events outside every histogram centrality class.
    pub unclassified: u64,
    /// Mixing attempts skipped because the pool was not ready.
    pub pool_not_ready: u64,
    /// Processed events that carried no event planes while sub-event flow was enabled.
    pub missing_event_planes: u64,
    pub kaons: u64,
    pub same_event_pairs: PairCounts,
    pub mixed_pairs: PairCounts,
    pub flow_candidates: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoVertex,
    VertexOutOfRange,
    NoCentrality,
    CentralityOutOfRange,
}

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Rejected(RejectReason),
    Processed(EventSummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSummary {
    pub kaons: usize,
    pub same_event_pairs: usize,
    pub mixed_pairs: usize,
    pub flow_candidates: usize,
    /// Whether the kaons were buffered for later mixing.
    pub pooled: bool,
}

/// Phi-meson reconstruction over a stream of events.
///
/// Events must be handed over one at a time through [`PhiAnalysis::process_event`]; every call
/// runs the full chain (event cuts, kaon selection, same-event pairing, mixed-event pairing,
/// pool update) before returning. The flow candidates of the latest event stay available through
/// [`PhiAnalysis::flow_candidates`] until the next call.
#[derive(Debug)]
pub struct PhiAnalysis {
    event_cuts: EventCuts,
    centrality_classes: BinEdges,
    selector: KaonSelector,
    pair_cuts: PairCuts,
    pool: Option<PoolManager>,
    histograms: MassHistograms,
    spectra: KaonSpectra,
    flow: Option<FlowProfiles>,
    flow_selector: Option<FlowCandidateSelector>,
    flow_candidates: Vec<FlowCandidate>,
    qa: Option<TrackQa>,
    stats: EventStats,
}

impl PhiAnalysis {
    pub fn new<R: PidResponse + 'static>(config: &AnalysisConfig, response: R) -> Self {
        //! Build an analysis from a validated configuration and the PID response it should use.
        //! Mixing is enabled when the configuration has a `[mixing]` section, flow candidates and
        //! sub-event flow when it has a `[flow]` section.
        info!(
            centrality_method = %config.events.centrality_method,
            mixing = config.mixing.is_some(),
            flow = config.flow.is_some(),
            qa = config.qa,
            "configured phi reconstruction"
        );
        Self {
            event_cuts: config.events.clone(),
            centrality_classes: config.centrality_classes.clone(),
            selector: KaonSelector::new(config.pid, config.dca, response),
            pair_cuts: PairCuts {
                dip_angle: config.dip_angle,
                window: config.candidate_window,
            },
            pool: config.mixing.as_ref().map(PoolManager::new),
            histograms: MassHistograms::new(&config.mass),
            spectra: KaonSpectra::new(),
            flow: config
                .flow
                .as_ref()
                .filter(|flow| flow.vzero_sub_events)
                .map(|_| FlowProfiles::new(&config.mass)),
            flow_selector: config.flow.as_ref().map(FlowCandidateSelector::new),
            flow_candidates: Vec::new(),
            qa: config.qa.then(TrackQa::new),
            stats: EventStats::default(),
        }
    }

    pub fn histograms(&self) -> &MassHistograms {
        &self.histograms
    }

    pub fn spectra(&self) -> &KaonSpectra {
        &self.spectra
    }

    pub fn flow(&self) -> Option<&FlowProfiles> {
        self.flow.as_ref()
    }

    pub fn flow_selector(&self) -> Option<&FlowCandidateSelector> {
        self.flow_selector.as_ref()
    }

    pub fn flow_candidates(&self) -> &[FlowCandidate] {
        &self.flow_candidates
    }

    pub fn qa(&self) -> Option<&TrackQa> {
        self.qa.as_ref()
    }

    pub fn stats(&self) -> &EventStats {
        &self.stats
    }

    pub fn pool(&self) -> Option<&PoolManager> {
        self.pool.as_ref()
    }

    pub fn selector(&self) -> &KaonSelector {
        &self.selector
    }

    fn check_event(&self, event: &Event) -> Result<f64, RejectReason> {
        let vz = event.vertex_z.ok_or(RejectReason::NoVertex)?;
        if !(vz.abs() <= self.event_cuts.vertex_range) {
            return Err(RejectReason::VertexOutOfRange);
        }
        let centrality = event.centrality.ok_or(RejectReason::NoCentrality)?;
        if !(centrality >= self.event_cuts.centrality_min
            && centrality < self.event_cuts.centrality_max)
        {
            return Err(RejectReason::CentralityOutOfRange);
        }
        Ok(centrality)
    }

    pub fn process_event(&mut self, event: &Event) -> EventOutcome {
        self.stats.events_seen += 1;
        self.flow_candidates.clear();
        let centrality = match self.check_event(event) {
            Ok(centrality) => centrality,
            Err(reason) => {
                match reason {
                    RejectReason::NoVertex | RejectReason::VertexOutOfRange => {
                        self.stats.rejected_vertex += 1
                    }
                    RejectReason::NoCentrality | RejectReason::CentralityOutOfRange => {
                        self.stats.rejected_centrality += 1
                    }
                }
                debug!(?reason, "event rejected");
                return EventOutcome::Rejected(reason);
            }
        };
        self.stats.processed += 1;

        let mut kaons = Vec::new();
        for track in &event.tracks {
            let is_kaon = self.selector.select(track);
            if let Some(qa) = self.qa.as_mut() {
                qa.fill(track, self.selector.response(), is_kaon);
            }
            if is_kaon {
                kaons.push(track.clone());
            }
        }
        self.stats.kaons += kaons.len() as u64;

        let class = self.centrality_classes.find(centrality);
        if class.is_none() {
            self.stats.unclassified += 1;
        }

        let mut summary = EventSummary {
            kaons: kaons.len(),
            ..Default::default()
        };

        let planes = match (&self.flow, event.event_planes.as_ref()) {
            (Some(_), None) => {
                self.stats.missing_event_planes += 1;
                None
            }
            (Some(_), planes) => planes,
            (None, _) => None,
        };
        if let (Some(flow), Some(planes), Some(class)) = (self.flow.as_mut(), planes, class) {
            flow.fill_resolution(planes, class);
        }

        let same_event: Vec<(&Track, &Track, CandidatePair)> = kaons
            .iter()
            .tuple_combinations()
            .filter_map(|(a, b)| self.pair_cuts.combine(a, b).map(|pair| (a, b, pair)))
            .collect();
        summary.same_event_pairs = same_event.len();
        for (a, b, pair) in &same_event {
            self.stats.same_event_pairs.add(pair.charge);
            if let Some(class) = class {
                let bin = self.histograms.score(pair, class, false);
                trace!(mass = pair.mass, bin, "same-event pair");
                if let (Some(flow), Some(planes)) = (self.flow.as_mut(), planes) {
                    if pair.charge == PairCharge::Unlike {
                        flow.fill_candidate(pair, class, planes);
                    }
                }
            }
            if let Some(candidate) = self
                .flow_selector
                .as_ref()
                .and_then(|selector| selector.select(pair, a, b))
            {
                self.flow_candidates.push(candidate);
            }
        }
        summary.flow_candidates = self.flow_candidates.len();
        self.stats.flow_candidates += self.flow_candidates.len() as u64;
        if let Some(class) = class {
            for kaon in &kaons {
                self.spectra.fill(kaon, class);
            }
        }

        if let Some(pool) = self.pool.as_mut() {
            match pool.classify(event.centrality, event.vertex_z) {
                Some(key) => {
                    if pool.is_ready(key) {
                        let mixed = pool.mix(&kaons, key, &self.pair_cuts);
                        summary.mixed_pairs = mixed.len();
                        for pair in &mixed {
                            self.stats.mixed_pairs.add(pair.charge);
                            if let Some(class) = class {
                                self.histograms.score(pair, class, true);
                            }
                        }
                    } else {
                        self.stats.pool_not_ready += 1;
                    }
                    summary.pooled = !kaons.is_empty();
                    pool.push(key, kaons);
                }
                None => self.stats.unpooled += 1,
            }
        }

        debug!(
            centrality,
            kaons = summary.kaons,
            same_event_pairs = summary.same_event_pairs,
            mixed_pairs = summary.mixed_pairs,
            flow_candidates = summary.flow_candidates,
            "event processed"
        );
        EventOutcome::Processed(summary)
    }
}

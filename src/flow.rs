use indexmap::IndexMap;

use crate::candidate::{CandidatePair, PairCharge};
use crate::config::{BinEdges, FlowConfig, MassBinning};
use crate::histogram::{Binning, Profile1D};
use crate::track::Track;

/// Flow harmonic, each measured against its own event plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Harmonic {
    Second,
    Third,
}

impl Harmonic {
    pub const ALL: [Harmonic; 2] = [Self::Second, Self::Third];

    pub fn order(&self) -> u8 {
        match self {
            Self::Second => 2,
            Self::Third => 3,
        }
    }
}

/// Side of the forward VZERO scintillator array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VzeroSide {
    A,
    C,
}

impl VzeroSide {
    pub const ALL: [VzeroSide; 2] = [Self::A, Self::C];

    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::C => "C",
        }
    }
}

/// Event-plane angles of one harmonic from the two VZERO sides and the TPC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubEventPlanes {
    pub vzero_a: f64,
    pub vzero_c: f64,
    pub tpc: f64,
}

impl SubEventPlanes {
    pub fn vzero(&self, side: VzeroSide) -> f64 {
        match side {
            VzeroSide::A => self.vzero_a,
            VzeroSide::C => self.vzero_c,
        }
    }
}

/// Sub-event planes of every measured harmonic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventPlanes {
    pub second: SubEventPlanes,
    pub third: SubEventPlanes,
}

impl EventPlanes {
    pub fn get(&self, harmonic: Harmonic) -> &SubEventPlanes {
        match harmonic {
            Harmonic::Second => &self.second,
            Harmonic::Third => &self.third,
        }
    }
}

/// Two sub-events whose plane correlation enters the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubEventPair {
    VzeroAVzeroC,
    VzeroATpc,
    VzeroCTpc,
}

impl SubEventPair {
    pub const ALL: [SubEventPair; 3] = [Self::VzeroAVzeroC, Self::VzeroATpc, Self::VzeroCTpc];

    /// Bin of the resolution profile holding this correlation.
    pub fn bin(&self) -> usize {
        match self {
            Self::VzeroAVzeroC => 0,
            Self::VzeroATpc => 1,
            Self::VzeroCTpc => 2,
        }
    }

    fn angles(&self, planes: &SubEventPlanes) -> (f64, f64) {
        match self {
            Self::VzeroAVzeroC => (planes.vzero_a, planes.vzero_c),
            Self::VzeroATpc => (planes.vzero_a, planes.tpc),
            Self::VzeroCTpc => (planes.vzero_c, planes.tpc),
        }
    }
}

/// Key of one $`v_n`$ versus invariant-mass profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub centrality_class: usize,
    pub harmonic: Harmonic,
    pub side: VzeroSide,
}

impl FlowKey {
    pub fn name(&self) -> String {
        //! Profile name in the form `V0A_v2_cen3`.
        format!(
            "V0{}_v{}_cen{}",
            self.side.label(),
            self.harmonic.order(),
            self.centrality_class
        )
    }
}

/// Sub-event flow of phi candidates.
///
/// For every candidate the profile keyed by (centrality class, harmonic, VZERO side) accumulates
/// $`\cos n(\varphi - \Psi_n)`$ against the candidate mass. Per event and centrality class the
/// resolution profile of each harmonic accumulates the three sub-event correlations, in the bins
/// given by [`SubEventPair::bin`].
#[derive(Debug, Clone)]
pub struct FlowProfiles {
    mass_binning: Binning,
    vn: IndexMap<FlowKey, Profile1D>,
    resolution: IndexMap<(usize, Harmonic), Profile1D>,
}

impl FlowProfiles {
    pub fn new(mass: &MassBinning) -> Self {
        Self {
            mass_binning: Binning::linear(mass.bins, mass.min, mass.max),
            vn: IndexMap::new(),
            resolution: IndexMap::new(),
        }
    }

    pub fn fill_resolution(&mut self, planes: &EventPlanes, centrality_class: usize) {
        for harmonic in Harmonic::ALL {
            let n = f64::from(harmonic.order());
            let sub = planes.get(harmonic);
            let profile = self
                .resolution
                .entry((centrality_class, harmonic))
                .or_insert_with(|| Profile1D::new(Binning::linear(3, 0.0, 3.0)));
            for pair in SubEventPair::ALL {
                let (a, b) = pair.angles(sub);
                profile.fill(pair.bin() as f64 + 0.5, (n * (a - b)).cos());
            }
        }
    }

    pub fn fill_candidate(
        &mut self,
        pair: &CandidatePair,
        centrality_class: usize,
        planes: &EventPlanes,
    ) {
        let binning = &self.mass_binning;
        for harmonic in Harmonic::ALL {
            let n = f64::from(harmonic.order());
            for side in VzeroSide::ALL {
                let psi = planes.get(harmonic).vzero(side);
                let key = FlowKey {
                    centrality_class,
                    harmonic,
                    side,
                };
                self.vn
                    .entry(key)
                    .or_insert_with(|| Profile1D::new(binning.clone()))
                    .fill(pair.mass, (n * (pair.phi - psi)).cos());
            }
        }
    }

    pub fn vn(&self, key: &FlowKey) -> Option<&Profile1D> {
        self.vn.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, &Profile1D)> {
        self.vn.iter()
    }

    pub fn resolution_profile(
        &self,
        centrality_class: usize,
        harmonic: Harmonic,
    ) -> Option<&Profile1D> {
        self.resolution.get(&(centrality_class, harmonic))
    }

    pub fn resolution(
        &self,
        centrality_class: usize,
        harmonic: Harmonic,
        side: VzeroSide,
    ) -> Option<f64> {
        //! Event-plane resolution of one VZERO side from the three-sub-event method,
        //! $` R_A = \sqrt{\langle\cos n(\Psi_A - \Psi_C)\rangle \langle\cos n(\Psi_A - \Psi_{TPC})\rangle / \langle\cos n(\Psi_C - \Psi_{TPC})\rangle} `$.
        //!
        //! [`None`] until the profile is filled, or when the correlations do not give a positive
        //! ratio.
        let profile = self.resolution_profile(centrality_class, harmonic)?;
        let ac = profile.mean(SubEventPair::VzeroAVzeroC.bin())?;
        let a_tpc = profile.mean(SubEventPair::VzeroATpc.bin())?;
        let c_tpc = profile.mean(SubEventPair::VzeroCTpc.bin())?;
        let ratio = match side {
            VzeroSide::A => ac * a_tpc / c_tpc,
            VzeroSide::C => ac * c_tpc / a_tpc,
        };
        (ratio.is_finite() && ratio > 0.0).then(|| ratio.sqrt())
    }

    pub fn is_empty(&self) -> bool {
        self.vn.is_empty() && self.resolution.is_empty()
    }
}

/// An unlike-sign phi candidate prepared for a flow event.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCandidate {
    pub mass: f64,
    pub pt: f64,
    pub phi: f64,
    pub eta: f64,
    pub pt_bin: usize,
    pub mass_band: usize,
    /// Labels of the two daughter tracks, so the host can remove them from its reference
    /// particles.
    pub daughters: [Option<i32>; 2],
}

/// Sorts unlike-sign candidates into transverse-momentum bins and invariant-mass bands.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCandidateSelector {
    pt_bins: BinEdges,
    mass_bands: BinEdges,
}

impl FlowCandidateSelector {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            pt_bins: config.pt_bins.clone(),
            mass_bands: config.mass_bands.clone(),
        }
    }

    pub fn n_pt_bins(&self) -> usize {
        self.pt_bins.n_bins()
    }

    pub fn n_mass_bands(&self) -> usize {
        self.mass_bands.n_bins()
    }

    pub fn select(&self, pair: &CandidatePair, t1: &Track, t2: &Track) -> Option<FlowCandidate> {
        //! The flow candidate for an accepted pair, or [`None`] for like-sign pairs and pairs
        //! outside the pt bins or mass bands.
        if pair.charge != PairCharge::Unlike {
            return None;
        }
        Some(FlowCandidate {
            mass: pair.mass,
            pt: pair.pt,
            phi: pair.phi,
            eta: pair.eta,
            pt_bin: self.pt_bins.find(pair.pt)?,
            mass_band: self.mass_bands.find(pair.mass)?,
            daughters: [t1.label(), t2.label()],
        })
    }

    pub fn group_by_band<'a>(&self, candidates: &'a [FlowCandidate]) -> Vec<Vec<&'a FlowCandidate>> {
        //! One list of candidates per mass band, in band order.
        let mut bands = vec![Vec::new(); self.n_mass_bands()];
        for candidate in candidates {
            if let Some(band) = bands.get_mut(candidate.mass_band) {
                band.push(candidate);
            }
        }
        bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    fn planes(vzero_a: f64, vzero_c: f64, tpc: f64) -> EventPlanes {
        let sub = SubEventPlanes {
            vzero_a,
            vzero_c,
            tpc,
        };
        EventPlanes {
            second: sub,
            third: sub,
        }
    }

    #[test]
    fn candidate_flow_is_measured_per_side() {
        let mut profiles = FlowProfiles::new(&MassBinning::default());
        let a = Track::from_momentum(0.5, 0.1, 0.0, 1);
        let b = Track::from_momentum(0.5, -0.1, 0.0, -1);
        let pair = CandidatePair::new(&a, &b);
        assert_relative_eq!(pair.phi, 0.0);
        profiles.fill_candidate(&pair, 4, &planes(0.0, FRAC_PI_4, 0.0));

        let key = |harmonic, side| FlowKey {
            centrality_class: 4,
            harmonic,
            side,
        };
        let v2_a = profiles.vn(&key(Harmonic::Second, VzeroSide::A)).unwrap();
        let bin = v2_a.binning().bin_index(pair.mass);
        assert_relative_eq!(v2_a.mean(bin).unwrap(), 1.0);
        let v2_c = profiles.vn(&key(Harmonic::Second, VzeroSide::C)).unwrap();
        assert_relative_eq!(v2_c.mean(bin).unwrap(), 0.0, epsilon = 1e-12);
        let v3_c = profiles.vn(&key(Harmonic::Third, VzeroSide::C)).unwrap();
        assert_relative_eq!(
            v3_c.mean(bin).unwrap(),
            (0.75 * std::f64::consts::PI).cos(),
            epsilon = 1e-12
        );
        assert_eq!(profiles.iter().count(), 4);
        assert_eq!(key(Harmonic::Third, VzeroSide::A).name(), "V0A_v3_cen4");
    }

    #[test]
    fn three_sub_event_resolution() {
        let mut profiles = FlowProfiles::new(&MassBinning::default());
        assert_eq!(profiles.resolution(0, Harmonic::Second, VzeroSide::A), None);
        profiles.fill_resolution(&planes(0.0, 0.3, 0.0), 0);
        let r_a = profiles
            .resolution(0, Harmonic::Second, VzeroSide::A)
            .unwrap();
        let r_c = profiles
            .resolution(0, Harmonic::Second, VzeroSide::C)
            .unwrap();
        assert_relative_eq!(r_a, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r_c, 0.6f64.cos(), epsilon = 1e-12);
        let third = profiles.resolution_profile(0, Harmonic::Third).unwrap();
        assert_relative_eq!(third.mean(0).unwrap(), 0.9f64.cos(), epsilon = 1e-12);
        assert_eq!(third.entries(), 3);
    }

    #[test]
    fn decorrelated_planes_give_no_resolution() {
        let mut profiles = FlowProfiles::new(&MassBinning::default());
        // the TPC correlation with side A is negative
        profiles.fill_resolution(&planes(0.0, 0.5, 1.0), 1);
        assert_eq!(profiles.resolution(1, Harmonic::Second, VzeroSide::A), None);
    }

    #[test]
    fn flow_candidates_are_binned_and_grouped() {
        let selector = FlowCandidateSelector::new(&FlowConfig {
            vzero_sub_events: false,
            pt_bins: BinEdges::new(vec![0.0, 1.0, 5.0]).unwrap(),
            mass_bands: BinEdges::new(vec![0.99, 1.01, 1.03, 1.09]).unwrap(),
        });
        let a = Track::from_momentum(0.7 + 0.0762, 0.1016, 0.05, 1).with_label(4);
        let b = Track::from_momentum(0.7 - 0.0762, -0.1016, 0.05, -1).with_label(9);
        let pair = CandidatePair::new(&a, &b);
        let candidate = selector.select(&pair, &a, &b).unwrap();
        assert_eq!(candidate.pt_bin, 1);
        assert_eq!(candidate.daughters, [Some(4), Some(9)]);
        assert_eq!(
            Some(candidate.mass_band),
            BinEdges::new(vec![0.99, 1.01, 1.03, 1.09])
                .unwrap()
                .find(pair.mass)
        );

        let c = Track::from_momentum(0.7, 0.0, 0.05, 1);
        let like = CandidatePair::new(&a, &c);
        assert!(selector.select(&like, &a, &c).is_none());

        let candidates = vec![candidate.clone(), candidate];
        let bands = selector.group_by_band(&candidates);
        assert_eq!(bands.len(), 3);
        assert_eq!(bands.iter().map(Vec::len).sum::<usize>(), 2);
    }
}

use crate::config::{CandidateWindow, DipAngleCut};
use crate::four_momentum::{FourMomentum, KAON_MASS};
use crate::track::Track;

/// Charge combination of a two-track pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairCharge {
    /// Opposite charges: signal plus combinatorial background.
    Unlike,
    /// Two positive tracks: combinatorial background only.
    LikePositive,
    /// Two negative tracks: combinatorial background only.
    LikeNegative,
}

impl PairCharge {
    pub const ALL: [PairCharge; 3] = [Self::Unlike, Self::LikePositive, Self::LikeNegative];

    pub fn classify(t1: &Track, t2: &Track) -> Self {
        if i16::from(t1.charge()) * i16::from(t2.charge()) < 0 {
            Self::Unlike
        } else if t1.charge() > 0 {
            Self::LikePositive
        } else {
            Self::LikeNegative
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unlike => "NP",
            Self::LikePositive => "PP",
            Self::LikeNegative => "NN",
        }
    }
}

pub fn invariant_mass(t1: &Track, t2: &Track) -> f64 {
    //! Two-body invariant mass with the kaon mass hypothesis for both tracks,
    //! $` M = \sqrt{(E_1 + E_2)^2 - |\overrightarrow{p}_1 + \overrightarrow{p}_2|^2} `$.
    (t1.four_momentum(KAON_MASS) + t2.four_momentum(KAON_MASS)).m()
}

pub fn delta_dip_angle(t1: &Track, t2: &Track) -> f64 {
    //! Absolute difference of the two tracks' dip angles.
    (t1.dip_angle() - t2.dip_angle()).abs()
}

/// A phi-meson candidate built from two kaon candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    pub mass: f64,
    pub pt: f64,
    pub eta: f64,
    /// Azimuth of the pair momentum in $`[0, 2\pi)`$.
    pub phi: f64,
    pub delta_dip: f64,
    pub charge: PairCharge,
}

impl CandidatePair {
    pub fn new(t1: &Track, t2: &Track) -> Self {
        let p4: FourMomentum = t1.four_momentum(KAON_MASS) + t2.four_momentum(KAON_MASS);
        let mut phi = p4.py.atan2(p4.px);
        if phi < 0.0 {
            phi += std::f64::consts::TAU;
        }
        Self {
            mass: p4.m(),
            pt: p4.pt(),
            eta: p4.eta(),
            phi,
            delta_dip: delta_dip_angle(t1, t2),
            charge: PairCharge::classify(t1, t2),
        }
    }
}

/// Pair-level acceptance shared by same-event and mixed-event pairing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairCuts {
    pub dip_angle: Option<DipAngleCut>,
    pub window: Option<CandidateWindow>,
}

impl PairCuts {
    pub fn accepts(&self, pair: &CandidatePair) -> bool {
        if let Some(dip) = self.dip_angle {
            if pair.pt < dip.pt_max && pair.delta_dip < dip.max_angle {
                return false;
            }
        }
        self.window
            .map_or(true, |window| window.contains(pair.eta, pair.pt))
    }

    pub fn combine(&self, t1: &Track, t2: &Track) -> Option<CandidatePair> {
        //! Build the candidate for `t1` and `t2`, or [`None`] if it fails the acceptance.
        let pair = CandidatePair::new(t1, t2);
        self.accepts(&pair).then_some(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mass_is_symmetric_and_physical() {
        let a = Track::from_momentum(0.7, -0.2, 0.4, 1);
        let b = Track::from_momentum(-0.1, 0.9, -1.3, -1);
        assert_relative_eq!(invariant_mass(&a, &b), invariant_mass(&b, &a));
        assert!(invariant_mass(&a, &b) >= 2.0 * KAON_MASS);
    }

    #[test]
    fn identical_tracks_sit_at_threshold() {
        let a = Track::from_momentum(0.3, 0.3, 0.3, 1);
        assert_relative_eq!(invariant_mass(&a, &a), 2.0 * KAON_MASS, epsilon = 1e-9);
    }

    #[test]
    fn mirrored_tracks_give_twice_the_energy() {
        let a = Track::from_momentum(0.3, 0.3, 0.3, 1);
        let b = Track::from_momentum(-0.3, -0.3, -0.3, -1);
        let e = (0.27 + KAON_MASS * KAON_MASS).sqrt();
        assert_relative_eq!(a.pt(), 0.3 * 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(invariant_mass(&a, &b), 2.0 * e, epsilon = 1e-12);
    }

    #[test]
    fn pair_azimuth_follows_summed_momentum() {
        let a = Track::from_momentum(-0.5, -0.1, 0.0, 1);
        let b = Track::from_momentum(-0.5, 0.1, 0.0, -1);
        let pair = CandidatePair::new(&a, &b);
        assert_relative_eq!(pair.phi, std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(pair.pt, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn charge_classes() {
        let pos = Track::from_momentum(1.0, 0.0, 0.0, 1);
        let neg = Track::from_momentum(0.0, 1.0, 0.0, -1);
        assert_eq!(PairCharge::classify(&pos, &neg), PairCharge::Unlike);
        assert_eq!(PairCharge::classify(&neg, &pos), PairCharge::Unlike);
        assert_eq!(PairCharge::classify(&pos, &pos), PairCharge::LikePositive);
        assert_eq!(PairCharge::classify(&neg, &neg), PairCharge::LikeNegative);
    }

    #[test]
    fn dip_angle_cut_only_below_pt_threshold() {
        let cuts = PairCuts {
            dip_angle: Some(DipAngleCut {
                max_angle: 0.04,
                pt_max: 2.5,
            }),
            window: None,
        };
        let a = Track::from_momentum(0.5, 0.0, 0.2, 1);
        let b = Track::from_momentum(0.0, 0.5, 0.2, -1);
        assert_relative_eq!(delta_dip_angle(&a, &b), 0.0);
        assert!(cuts.combine(&a, &b).is_none());

        let c = Track::from_momentum(2.0, 0.0, 0.8, 1);
        let d = Track::from_momentum(1.8, 0.4, 0.8, -1);
        let fast = CandidatePair::new(&c, &d);
        assert!(fast.pt > 2.5);
        assert!(fast.delta_dip < 0.04);
        assert!(cuts.accepts(&fast));

        let e = Track::from_momentum(0.0, 0.5, 1.5, -1);
        assert!(cuts.combine(&a, &e).is_some());
    }

    #[test]
    fn candidate_window_applies_to_pair() {
        let cuts = PairCuts {
            dip_angle: None,
            window: Some(CandidateWindow {
                eta_min: -0.8,
                eta_max: 0.8,
                pt_min: 0.0,
                pt_max: 1.0,
            }),
        };
        let a = Track::from_momentum(0.4, 0.0, 0.0, 1);
        let b = Track::from_momentum(0.0, 0.4, 0.0, -1);
        assert!(cuts.combine(&a, &b).is_some());
        let c = Track::from_momentum(0.9, 0.0, 0.0, 1);
        assert!(cuts.combine(&a, &c).is_none());
    }
}

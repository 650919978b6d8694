use crate::flow::EventPlanes;
use crate::four_momentum::FourMomentum;

/// Detector signals used for kaon identification.
///
/// Every field is optional: a detector that gave no response for the track leaves its entry
/// empty, and any cut that needs it then fails.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidSignals {
    /// Deviation of the TPC energy loss from the kaon expectation, in units of resolution.
    pub tpc_n_sigma: Option<f64>,
    /// Deviation of the TOF time of flight from the kaon expectation, in units of resolution.
    pub tof_n_sigma: Option<f64>,
    /// Combined Bayesian probability for the kaon hypothesis.
    pub bayesian_probability: Option<f64>,
    /// Whether the track passed the TPC-standalone reconstruction filter.
    pub tpc_standalone: bool,
}

/// Distance of closest approach of a track to the primary vertex, in cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dca {
    pub xy: f64,
    pub z: f64,
}

/// An immutable snapshot of a reconstructed charged track.
///
/// Kinematics are derived once from the momentum components in [`Track::from_momentum`], so a
/// [`Track`] is always internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    px: f64,
    py: f64,
    pz: f64,
    p: f64,
    pt: f64,
    eta: f64,
    phi: f64,
    charge: i8,
    label: Option<i32>,
    pid: PidSignals,
    dca: Option<Dca>,
}

impl Track {
    pub fn from_momentum(px: f64, py: f64, pz: f64, charge: i8) -> Self {
        //! Build a [`Track`] from its momentum components (GeV/$`c`$) and charge sign.
        //!
        //! The azimuthal angle is mapped into $`[0, 2\pi)`$.
        let p4 = FourMomentum::new(0.0, px, py, pz);
        let mut phi = py.atan2(px);
        if phi < 0.0 {
            phi += std::f64::consts::TAU;
        }
        Self {
            px,
            py,
            pz,
            p: p4.momentum().norm(),
            pt: p4.pt(),
            eta: p4.eta(),
            phi,
            charge,
            label: None,
            pid: PidSignals::default(),
            dca: None,
        }
    }

    pub fn with_pid(mut self, pid: PidSignals) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_dca(mut self, xy: f64, z: f64) -> Self {
        self.dca = Some(Dca { xy, z });
        self
    }

    pub fn with_label(mut self, label: i32) -> Self {
        //! Attach the Monte Carlo label associating this track with a generated particle.
        self.label = Some(label);
        self
    }

    pub fn px(&self) -> f64 {
        self.px
    }
    pub fn py(&self) -> f64 {
        self.py
    }
    pub fn pz(&self) -> f64 {
        self.pz
    }
    pub fn p(&self) -> f64 {
        self.p
    }
    pub fn pt(&self) -> f64 {
        self.pt
    }
    pub fn eta(&self) -> f64 {
        self.eta
    }
    pub fn phi(&self) -> f64 {
        self.phi
    }
    pub fn charge(&self) -> i8 {
        self.charge
    }
    pub fn label(&self) -> Option<i32> {
        self.label
    }
    pub fn pid(&self) -> &PidSignals {
        &self.pid
    }
    pub fn dca(&self) -> Option<Dca> {
        self.dca
    }

    pub fn four_momentum(&self, mass: f64) -> FourMomentum {
        //! The four-momentum of this track under the given mass hypothesis.
        FourMomentum::from_momentum(self.px, self.py, self.pz, mass)
    }

    pub fn dip_angle(&self) -> f64 {
        //! Angle of the trajectory relative to the transverse plane, $`\arctan(p_z / p_T)`$.
        self.pz.atan2(self.pt)
    }
}

/// A generated (Monte Carlo truth) particle.
///
/// Generator charges are stored in units of $`e/3`$, which is how event generators report them.
#[derive(Debug, Clone, PartialEq)]
pub struct McParticle {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub charge_thirds: i32,
    pub label: i32,
}

/// The common view of a reconstructed or generated particle used when caching variable values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleView {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    /// Charge in units of $`e`$.
    pub charge: f64,
    pub label: Option<i32>,
}

impl From<&Track> for ParticleView {
    fn from(track: &Track) -> Self {
        Self {
            pt: track.pt,
            eta: track.eta,
            phi: track.phi,
            charge: f64::from(track.charge),
            label: track.label,
        }
    }
}

impl From<&McParticle> for ParticleView {
    fn from(particle: &McParticle) -> Self {
        Self {
            pt: particle.pt,
            eta: particle.eta,
            phi: particle.phi,
            charge: f64::from(particle.charge_thirds) / 3.0,
            label: Some(particle.label),
        }
    }
}

/// A single collision event as delivered by the host framework.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// Centrality percentile from the configured estimator, if it could be determined.
    pub centrality: Option<f64>,
    /// Position of the primary vertex along the beam axis in cm, if a vertex was found.
    pub vertex_z: Option<f64>,
    pub tracks: Vec<Track>,
    /// Sub-event planes of the flow harmonics, when the host reconstructed them.
    pub event_planes: Option<EventPlanes>,
}

impl Event {
    pub fn new(centrality: f64, vertex_z: f64, tracks: Vec<Track>) -> Self {
        Self {
            centrality: Some(centrality),
            vertex_z: Some(vertex_z),
            tracks,
            event_planes: None,
        }
    }

    pub fn with_event_planes(mut self, planes: EventPlanes) -> Self {
        self.event_planes = Some(planes);
        self
    }
}

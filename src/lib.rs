//! Phi-meson reconstruction with mixed-event background, and a variable manager for filling
//! correction-framework containers.
//!
//! Events are handed to a [`analysis::PhiAnalysis`] one at a time. Each accepted event has its
//! kaon candidates selected, paired with each other and (once the matching mixing pool is
//! ready) with the kaon candidates of earlier, similar events. The resulting invariant masses
//! are histogrammed per centrality class, charge combination and pair origin. Unlike-sign pairs
//! can also be correlated with the event's sub-event planes and handed on as flow candidates.
pub mod analysis;
pub mod candidate;
pub mod config;
pub mod container;
pub mod flow;
pub mod four_momentum;
pub mod histogram;
pub mod mixing;
pub mod pid;
pub mod qa;
pub mod track;
pub mod var_manager;
pub mod prelude {
    pub use crate::analysis::{
        EventOutcome, EventStats, EventSummary, MassHistograms, MassKey, PairOrigin, PhiAnalysis,
        RejectReason,
    };
    pub use crate::candidate::{
        delta_dip_angle, invariant_mass, CandidatePair, PairCharge, PairCuts,
    };
    pub use crate::config::{
        AnalysisConfig, BinEdges, CandidateWindow, ConfigError, DcaThresholds, DipAngleCut,
        FlowConfig, MixedBackground, MixingConfig, PidConfig, PidStrategy, PidThresholds,
    };
    pub use crate::container::{Axis, CfContainer};
    pub use crate::flow::{
        EventPlanes, FlowCandidate, FlowCandidateSelector, FlowKey, FlowProfiles, Harmonic,
        SubEventPlanes, VzeroSide,
    };
    pub use crate::four_momentum::{FourMomentum, KAON_MASS};
    pub use crate::histogram::{Binning, Histogram1D, Histogram2D, Profile1D};
    pub use crate::mixing::{EventPool, MixingBins, PoolKey, PoolManager};
    pub use crate::pid::{KaonSelector, PidResponse, RecordedResponse};
    pub use crate::qa::TrackQa;
    pub use crate::track::{Event, McParticle, ParticleView, PidSignals, Track};
    pub use crate::var_manager::{
        SignalCuts, VarManager, VariableCode, VariableDescriptor, WeightSource, WeightTable,
    };
}

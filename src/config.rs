use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// The largest bin-edge table accepted for mixing or centrality classes.
pub const MAX_BIN_EDGES: usize = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read configuration file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("a bin edge table needs between 2 and 20 edges, got {count}")]
    EdgeCount { count: usize },
    #[error("bin edges must be strictly increasing, edge {index} ({value}) is not")]
    UnorderedEdges { index: usize, value: f64 },
    #[error("mass binning needs at least one bin and min < max, got {bins} bins in [{min}, {max})")]
    InvalidMassBinning { bins: usize, min: f64, max: f64 },
    #[error("centrality range [{min}, {max}) is empty")]
    EmptyCentralityRange { min: f64, max: f64 },
    #[error("mixing pool depth must be at least 1")]
    ZeroPoolDepth,
    #[error("mixing must keep at least one track per event")]
    ZeroTracksPerEvent,
}

/// A validated, strictly increasing table of 2 to [`MAX_BIN_EDGES`] bin edges.
///
/// Bin `i` covers `[edges[i], edges[i + 1])`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub fn new(edges: Vec<f64>) -> Result<Self, ConfigError> {
        if edges.len() < 2 || edges.len() > MAX_BIN_EDGES {
            return Err(ConfigError::EdgeCount { count: edges.len() });
        }
        for (index, pair) in edges.windows(2).enumerate() {
            if pair[1].is_nan() || pair[1] <= pair[0] {
                return Err(ConfigError::UnorderedEdges {
                    index: index + 1,
                    value: pair[1],
                });
            }
        }
        Ok(Self(edges))
    }

    pub fn n_bins(&self) -> usize {
        self.0.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.0
    }

    pub fn find(&self, value: f64) -> Option<usize> {
        //! Bin holding `value`, or [`None`] when it lies outside the table (or is `NaN`).
        if !(value >= self.0[0] && value < self.0[self.0.len() - 1]) {
            return None;
        }
        Some(self.0.partition_point(|edge| *edge <= value) - 1)
    }
}

impl TryFrom<Vec<f64>> for BinEdges {
    type Error = ConfigError;
    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Event-level acceptance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EventCuts {
    pub centrality_min: f64,
    pub centrality_max: f64,
    /// Name of the centrality estimator the host used, kept for bookkeeping.
    pub centrality_method: String,
    /// Maximum $`|v_z|`$ in cm.
    pub vertex_range: f64,
}

impl Default for EventCuts {
    fn default() -> Self {
        Self {
            centrality_min: 0.0,
            centrality_max: 90.0,
            centrality_method: "V0M".to_string(),
            vertex_range: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidStrategy {
    /// Momentum-staged TPC, TPC+TOF and Bayesian selection.
    #[default]
    Bayesian,
    /// TPC energy-loss deviation only, at every momentum.
    TpcOnly,
}

/// The seven PID thresholds, in the order of the legacy configuration vector.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidThresholds {
    pub tpc_n_sigma: f64,
    /// Below this pt the TPC alone identifies kaons.
    pub tpc_pt_max: f64,
    pub tof_n_sigma: f64,
    pub tpc_n_sigma_with_tof: f64,
    /// Above this pt the Bayesian probability is used.
    pub tof_pt_max: f64,
    pub min_pt: f64,
    pub bayesian_probability: f64,
}

impl Default for PidThresholds {
    fn default() -> Self {
        [3.0, 0.5, 3.0, 3.0, 4.0, 0.2, 0.8].into()
    }
}

impl From<[f64; 7]> for PidThresholds {
    fn from(v: [f64; 7]) -> Self {
        Self {
            tpc_n_sigma: v[0],
            tpc_pt_max: v[1],
            tof_n_sigma: v[2],
            tpc_n_sigma_with_tof: v[3],
            tof_pt_max: v[4],
            min_pt: v[5],
            bayesian_probability: v[6],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub strategy: PidStrategy,
    /// Only accept tracks that passed the TPC-standalone filter.
    pub require_tpc_standalone: bool,
    pub thresholds: PidThresholds,
}

/// The five DCA thresholds, in the order of the legacy configuration vector.
///
/// The transverse limit is $`\min(xy_{max}, c + s / p_T^{k})`$.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DcaThresholds {
    pub xy_max: f64,
    pub z_max: f64,
    pub xy_constant: f64,
    pub xy_slope: f64,
    pub xy_power: f64,
}

impl From<[f64; 5]> for DcaThresholds {
    fn from(v: [f64; 5]) -> Self {
        Self {
            xy_max: v[0],
            z_max: v[1],
            xy_constant: v[2],
            xy_slope: v[3],
            xy_power: v[4],
        }
    }
}

/// Pseudorapidity and transverse-momentum window applied to phi candidates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CandidateWindow {
    pub eta_min: f64,
    pub eta_max: f64,
    pub pt_min: f64,
    pub pt_max: f64,
}

impl CandidateWindow {
    pub fn contains(&self, eta: f64, pt: f64) -> bool {
        eta > self.eta_min && eta < self.eta_max && pt > self.pt_min && pt < self.pt_max
    }
}

/// Rejects pairs with nearly equal dip angles below a pair-pt threshold.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DipAngleCut {
    pub max_angle: f64,
    pub pt_max: f64,
}

/// Which charge combinations of mixed pairs make up the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedBackground {
    #[default]
    All,
    UnlikeSign,
    LikeSign,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MixingConfig {
    /// Number of past events kept per pool.
    pub pool_depth: usize,
    /// Tracks a pool must hold before it is mixed.
    pub min_tracks: usize,
    /// Events a pool must hold before it is mixed.
    pub min_events: usize,
    pub max_tracks_per_event: usize,
    pub background: MixedBackground,
    pub centrality_bins: BinEdges,
    pub vertex_bins: BinEdges,
}

impl Default for MixingConfig {
    fn default() -> Self {
        Self {
            pool_depth: 10,
            min_tracks: 20,
            min_events: 5,
            max_tracks_per_event: 500,
            background: MixedBackground::All,
            centrality_bins: BinEdges(vec![
                0.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0,
            ]),
            vertex_bins: BinEdges(vec![
                -10.0, -8.0, -6.0, -4.0, -2.0, 0.0, 2.0, 4.0, 6.0, 8.0, 10.0,
            ]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MassBinning {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

impl Default for MassBinning {
    fn default() -> Self {
        Self {
            bins: 100,
            min: 0.99,
            max: 1.09,
        }
    }
}

/// Flow analysis of unlike-sign candidates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Fill $`v_n`$ versus mass and resolution profiles from the VZERO and TPC sub-event planes.
    pub vzero_sub_events: bool,
    /// Transverse-momentum bins of the flow candidates.
    pub pt_bins: BinEdges,
    /// Invariant-mass bands of the flow candidates.
    pub mass_bands: BinEdges,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            vzero_sub_events: true,
            pt_bins: BinEdges(vec![
                0.0, 0.3, 0.6, 0.9, 1.2, 1.5, 1.8, 2.1, 2.4, 2.7, 3.0, 3.3, 3.6, 3.9, 4.5, 5.4, 7.0,
                10.0,
            ]),
            mass_bands: BinEdges(vec![
                0.99, 1.0, 1.01, 1.02, 1.03, 1.04, 1.05, 1.06, 1.07, 1.08, 1.09,
            ]),
        }
    }
}

/// Complete configuration of a phi reconstruction.
///
/// Every section has defaults, so an empty TOML document is a valid configuration:
///
/// ```
/// use phiflow::config::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml(
///     r#"
///     [events]
///     vertex_range = 7.0
///
///     [dip_angle]
///     max_angle = 0.04
///     pt_max = 2.5
///
///     [mixing]
///     pool_depth = 5
///     min_events = 3
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.mixing.unwrap().pool_depth, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub events: EventCuts,
    pub pid: PidConfig,
    pub dca: Option<DcaThresholds>,
    pub candidate_window: Option<CandidateWindow>,
    pub dip_angle: Option<DipAngleCut>,
    pub mixing: Option<MixingConfig>,
    pub flow: Option<FlowConfig>,
    pub mass: MassBinning,
    /// Fill the PID and DCA quality-assurance histograms.
    pub qa: bool,
    /// Centrality classes of the output histograms.
    pub centrality_classes: BinEdges,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            events: EventCuts::default(),
            pid: PidConfig::default(),
            dca: None,
            candidate_window: None,
            dip_angle: None,
            mixing: None,
            flow: None,
            mass: MassBinning::default(),
            qa: false,
            centrality_classes: BinEdges((0..=18).map(|i| 5.0 * f64::from(i)).collect()),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        //! Checks the constraints serde cannot express on its own. Bin-edge tables are already
        //! validated when they are built.
        let mass = &self.mass;
        if mass.bins == 0 || !(mass.min < mass.max) {
            return Err(ConfigError::InvalidMassBinning {
                bins: mass.bins,
                min: mass.min,
                max: mass.max,
            });
        }
        if !(self.events.centrality_min < self.events.centrality_max) {
            return Err(ConfigError::EmptyCentralityRange {
                min: self.events.centrality_min,
                max: self.events.centrality_max,
            });
        }
        if let Some(mixing) = &self.mixing {
            if mixing.pool_depth == 0 {
                return Err(ConfigError::ZeroPoolDepth);
            }
            if mixing.max_tracks_per_event == 0 {
                return Err(ConfigError::ZeroTracksPerEvent);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.centrality_classes.n_bins(), 18);
        assert!(config.mixing.is_none());
    }

    #[test]
    fn bin_edges_are_validated() {
        assert!(matches!(
            BinEdges::new(vec![1.0]),
            Err(ConfigError::EdgeCount { count: 1 })
        ));
        assert!(matches!(
            BinEdges::new((0..21).map(|i| i as f64).collect()),
            Err(ConfigError::EdgeCount { count: 21 })
        ));
        assert!(matches!(
            BinEdges::new(vec![0.0, 5.0, 5.0]),
            Err(ConfigError::UnorderedEdges { index: 2, .. })
        ));
        let parsed = AnalysisConfig::from_toml("centrality_classes = [10.0, 0.0]");
        assert!(parsed.is_err());
    }

    #[test]
    fn bin_lookup_excludes_upper_edge() {
        let edges = BinEdges::new(vec![0.0, 10.0, 20.0]).unwrap();
        assert_eq!(edges.find(0.0), Some(0));
        assert_eq!(edges.find(10.0), Some(1));
        assert_eq!(edges.find(20.0), None);
        assert_eq!(edges.find(-0.1), None);
        assert_eq!(edges.find(f64::NAN), None);
    }

    #[test]
    fn legacy_vectors_map_to_named_fields() {
        let pid = PidThresholds::from([2.0, 0.4, 2.5, 3.5, 3.0, 0.15, 0.9]);
        assert_eq!(pid.tof_n_sigma, 2.5);
        assert_eq!(pid.bayesian_probability, 0.9);
        let dca = DcaThresholds::from([2.4, 3.2, 0.0105, 0.035, 1.1]);
        assert_eq!(dca.z_max, 3.2);
        assert_eq!(dca.xy_power, 1.1);
    }

    #[test]
    fn sections_parse_and_validate() {
        let config = AnalysisConfig::from_toml(
            r#"
            [pid]
            strategy = "tpc_only"
            require_tpc_standalone = true

            [dca]
            xy_max = 2.4
            z_max = 3.2
            xy_constant = 0.0105
            xy_slope = 0.035
            xy_power = 1.1

            [mixing]
            pool_depth = 5
            centrality_bins = [0.0, 10.0, 20.0]
            vertex_bins = [-10.0, 0.0, 10.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.pid.strategy, PidStrategy::TpcOnly);
        assert!(config.pid.require_tpc_standalone);
        let mixing = config.mixing.unwrap();
        assert_eq!(mixing.centrality_bins.n_bins(), 2);
        assert_eq!(mixing.min_events, 5);

        let zero_depth = AnalysisConfig::from_toml("[mixing]\npool_depth = 0\n");
        assert!(matches!(zero_depth, Err(ConfigError::ZeroPoolDepth)));
        let no_tracks = AnalysisConfig::from_toml("[mixing]\nmax_tracks_per_event = 0\n");
        assert!(matches!(no_tracks, Err(ConfigError::ZeroTracksPerEvent)));
        let bad_mass = AnalysisConfig::from_toml("[mass]\nbins = 0\n");
        assert!(matches!(
            bad_mass,
            Err(ConfigError::InvalidMassBinning { .. })
        ));
    }

    #[test]
    fn flow_and_background_sections() {
        let config = AnalysisConfig::from_toml(
            r#"
            qa = true

            [mixing]
            background = "like_sign"

            [flow]
            vzero_sub_events = false
            mass_bands = [1.0, 1.01, 1.03]
            "#,
        )
        .unwrap();
        assert!(config.qa);
        assert_eq!(
            config.mixing.unwrap().background,
            MixedBackground::LikeSign
        );
        let flow = config.flow.unwrap();
        assert!(!flow.vzero_sub_events);
        assert_eq!(flow.mass_bands.n_bins(), 2);
        assert_eq!(flow.pt_bins, FlowConfig::default().pt_bins);
        assert_eq!(flow.pt_bins.edges().len(), 18);
    }
}

use std::f64::consts::TAU;
use std::fmt::Debug;

use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

use crate::container::{Axis, CfContainer};
use crate::histogram::Binning;
use crate::track::{McParticle, ParticleView, Track};

/// Observable a registered variable evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableCode {
    Pt,
    Eta,
    Phi,
    Charge,
    Source,
    Centrality,
    Species,
}

/// Name, observable and binning of one container dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub name: &'static str,
    pub code: VariableCode,
    pub n_bins: usize,
    pub min: f64,
    pub max: f64,
    pub logarithmic: bool,
}

impl VariableDescriptor {
    const fn new(
        name: &'static str,
        code: VariableCode,
        n_bins: usize,
        min: f64,
        max: f64,
        logarithmic: bool,
    ) -> Self {
        Self {
            name,
            code,
            n_bins,
            min,
            max,
            logarithmic,
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        //! The predefined descriptor for a symbolic variable name.
        use VariableCode::*;
        Some(match name {
            "pt" => Self::new("pt", Pt, 44, 0.1, 20.0, true),
            "eta" => Self::new("eta", Eta, 8, -0.8, 0.8, false),
            "phi" => Self::new("phi", Phi, 18, 0.0, TAU, false),
            "charge" => Self::new("charge", Charge, 2, -1.1, 1.1, false),
            "source" => Self::new("source", Source, 4, 0.0, 4.0, false),
            "centrality" => Self::new("centrality", Centrality, 11, 0.0, 11.0, false),
            "species" => Self::new("species", Species, 6, -1.0, 5.0, false),
            _ => return None,
        })
    }

    pub fn binning(&self) -> Binning {
        if self.logarithmic {
            Binning::logarithmic(self.n_bins, self.min, self.max)
        } else {
            Binning::linear(self.n_bins, self.min, self.max)
        }
    }
}

/// Heavy-flavour origin of an electron candidate, as decided by the MC truth.
pub trait SignalCuts: Send + Sync + Debug {
    fn is_charm_electron(&self, particle: &ParticleView) -> bool;
    fn is_beauty_electron(&self, particle: &ParticleView) -> bool;
    fn is_gamma_electron(&self, particle: &ParticleView) -> bool;
}

/// Weight factors in bins of (pt, eta, phi). Lookups outside the table use the edge bins.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    pt: Binning,
    eta: Binning,
    phi: Binning,
    values: Vec<f64>,
}

impl WeightTable {
    pub fn new(pt: Binning, eta: Binning, phi: Binning) -> Self {
        //! A table with every weight set to `1.0`.
        let size = pt.n_bins() * eta.n_bins() * phi.n_bins();
        Self {
            pt,
            eta,
            phi,
            values: vec![1.0; size],
        }
    }

    fn index(&self, ipt: usize, ieta: usize, iphi: usize) -> usize {
        (ipt * self.eta.n_bins() + ieta) * self.phi.n_bins() + iphi
    }

    pub fn set(&mut self, ipt: usize, ieta: usize, iphi: usize, weight: f64) {
        let index = self.index(ipt, ieta, iphi);
        if let Some(slot) = self.values.get_mut(index) {
            *slot = weight;
        }
    }

    pub fn lookup(&self, pt: f64, eta: f64, phi: f64) -> f64 {
        let index = self.index(
            self.pt.bin_index(pt),
            self.eta.bin_index(eta),
            self.phi.bin_index(phi),
        );
        self.values[index]
    }
}

pub type WeightFunction = dyn Fn(f64, f64, f64) -> f64 + Send + Sync;

/// Where per-track weights come from.
pub enum WeightSource {
    Table(WeightTable),
    Function(Box<WeightFunction>),
}

impl Debug for WeightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl WeightSource {
    pub fn weight(&self, pt: f64, eta: f64, phi: f64) -> f64 {
        match self {
            Self::Table(table) => table.lookup(pt, eta, phi),
            Self::Function(function) => function(pt, eta, phi),
        }
    }
}

/// Keeps the list of variables filled into correction-framework containers and caches their
/// values for the current track.
///
/// Defining a variable with [`VarManager::add_variable`] adds a dimension to every container
/// bound with [`VarManager::define_variables`]. [`VarManager::new_track`] caches the values
/// of the next track and [`VarManager::fill_container`] writes them out.
///
/// ```
/// use phiflow::prelude::*;
///
/// let mut manager = VarManager::new("hfe");
/// for name in ["pt", "bogus", "eta"] {
///     manager.add_variable(name);
/// }
/// assert_eq!(manager.n_variables(), 2);
/// assert!(!manager.is_defined("bogus"));
///
/// let mut container = CfContainer::new("tracks", &["reconstructed"]);
/// manager.define_variables(&mut container);
/// let track = Track::from_momentum(1.0, 0.5, 0.2, -1);
/// manager.new_track(Some(&track), None, 10.0, 3, true);
/// assert!(manager.fill_container(&mut container, 0, false, 1.0));
/// assert_eq!(container.entries(0), 1);
/// ```
#[derive(Debug)]
pub struct VarManager {
    name: String,
    variables: IndexMap<&'static str, VariableDescriptor>,
    content: Vec<f64>,
    content_mc: Vec<f64>,
    weight_factor: f64,
    signal_track: bool,
    weighting: Option<WeightSource>,
    signal: Option<Box<dyn SignalCuts>>,
}

impl VarManager {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variables: IndexMap::new(),
            content: Vec::new(),
            content_mc: Vec::new(),
            weight_factor: 1.0,
            signal_track: true,
            weighting: None,
            signal: None,
        }
    }

    pub fn add_variable(&mut self, name: &str) -> bool {
        //! Register a predefined variable by name. Unknown names, and names that are already
        //! registered, are ignored; the return value tells whether a dimension was added.
        let Some(descriptor) = VariableDescriptor::lookup(name) else {
            warn!(manager = %self.name, variable = name, "unknown variable ignored");
            return false;
        };
        if self.variables.contains_key(descriptor.name) {
            debug!(manager = %self.name, variable = name, "variable already defined");
            return false;
        }
        debug!(manager = %self.name, variable = name, "variable added");
        self.variables.insert(descriptor.name, descriptor);
        self.resize_caches();
        true
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.values()
    }

    fn resize_caches(&mut self) {
        self.content.resize(self.variables.len(), 0.0);
        self.content_mc.resize(self.variables.len(), 0.0);
    }

    pub fn define_variables(&mut self, container: &mut CfContainer) {
        //! Give `container` one axis per registered variable, in registration order, and reset
        //! the value caches.
        let axes = self
            .variables
            .values()
            .map(|var| Axis::new(var.name, var.binning()))
            .collect();
        container.set_axes(axes);
        self.content = vec![0.0; self.variables.len()];
        self.content_mc = vec![0.0; self.variables.len()];
        info!(
            manager = %self.name,
            container = container.name(),
            dimensions = self.variables.len(),
            "container binned"
        );
    }

    pub fn define_correlation_matrix(&self, name: &str) -> CfContainer {
        //! A single-step container with every variable twice, reconstructed axes first and MC
        //! axes second, matching [`VarManager::fill_correlation_matrix`].
        let mut matrix = CfContainer::new(name, &["correlation"]);
        let reco = self
            .variables
            .values()
            .map(|var| Axis::new(&format!("{}_rec", var.name), var.binning()));
        let mc = self
            .variables
            .values()
            .map(|var| Axis::new(&format!("{}_mc", var.name), var.binning()));
        matrix.set_axes(reco.chain(mc).collect());
        matrix
    }

    pub fn set_signal_cuts<S: SignalCuts + 'static>(&mut self, signal: S) {
        self.signal = Some(Box::new(signal));
    }

    pub fn set_weight_table(&mut self, table: WeightTable) {
        self.weighting = Some(WeightSource::Table(table));
    }

    pub fn set_weight_function<F>(&mut self, function: F)
    where
        F: 'static + Fn(f64, f64, f64) -> f64 + Send + Sync,
    {
        self.weighting = Some(WeightSource::Function(Box::new(function)));
    }

    pub fn weight_factor(&self) -> f64 {
        self.weight_factor
    }

    pub fn is_signal_track(&self) -> bool {
        self.signal_track
    }

    pub fn content(&self) -> &[f64] {
        &self.content
    }

    pub fn content_mc(&self) -> &[f64] {
        &self.content_mc
    }

    pub fn new_track(
        &mut self,
        rec: Option<&Track>,
        mc: Option<&McParticle>,
        centrality: f64,
        species: i32,
        signal: bool,
    ) {
        //! Cache the values of every variable for the next track.
        //!
        //! The MC cache is only overwritten when `mc` is given. With weighting enabled and `pt`,
        //! `eta` and `phi` all registered, the weight factor is recomputed from the new
        //! reconstructed values.
        self.signal_track = signal;
        let rec = rec.map(ParticleView::from);
        let content: Vec<f64> = self
            .variables
            .values()
            .map(|var| self.value(rec.as_ref(), var.code, centrality, species))
            .collect();
        self.content = content;
        if let Some(mc) = mc.map(ParticleView::from) {
            let content_mc: Vec<f64> = self
                .variables
                .values()
                .map(|var| self.value(Some(&mc), var.code, centrality, species))
                .collect();
            self.content_mc = content_mc;
        }
        if let Some(weighting) = &self.weighting {
            let position = |code: VariableCode| self.variables.values().position(|var| var.code == code);
            if let (Some(ipt), Some(ieta), Some(iphi)) = (
                position(VariableCode::Pt),
                position(VariableCode::Eta),
                position(VariableCode::Phi),
            ) {
                let (pt, eta, phi) = (self.content[ipt], self.content[ieta], self.content[iphi]);
                self.weight_factor = weighting.weight(pt, eta, phi);
                trace!(pt, eta, phi, weight = self.weight_factor, "track weight");
            }
        }
    }

    fn value(
        &self,
        particle: Option<&ParticleView>,
        code: VariableCode,
        centrality: f64,
        species: i32,
    ) -> f64 {
        let Some(particle) = particle else {
            return 0.0;
        };
        match code {
            VariableCode::Pt => particle.pt,
            VariableCode::Eta => particle.eta,
            VariableCode::Phi => particle.phi,
            VariableCode::Charge => particle.charge,
            VariableCode::Source => self.signal.as_ref().map_or(0.0, |signal| {
                if signal.is_charm_electron(particle) {
                    0.0
                } else if signal.is_beauty_electron(particle) {
                    1.0
                } else if signal.is_gamma_electron(particle) {
                    2.0
                } else {
                    3.0
                }
            }),
            VariableCode::Species => f64::from(species),
            VariableCode::Centrality => centrality,
        }
    }

    pub fn fill_container(
        &self,
        container: &mut CfContainer,
        step: usize,
        use_mc: bool,
        external_weight: f64,
    ) -> bool {
        //! Fill the cached reconstructed (or MC) values into `step`, weighted by the cached
        //! weight factor times `external_weight`.
        let content = if use_mc {
            &self.content_mc
        } else {
            &self.content
        };
        container.fill(content, step, self.weight_factor * external_weight)
    }

    pub fn fill_container_step_name(
        &self,
        container: &mut CfContainer,
        step: &str,
        use_mc: bool,
        external_weight: f64,
    ) -> bool {
        match container.step_index(step) {
            Some(index) => self.fill_container(container, index, use_mc, external_weight),
            None => {
                debug!(container = container.name(), step, "unknown step skipped");
                false
            }
        }
    }

    pub fn fill_correlation_matrix(&self, matrix: &mut CfContainer) -> bool {
        let values: Vec<f64> = self
            .content
            .iter()
            .chain(self.content_mc.iter())
            .copied()
            .collect();
        matrix.fill(&values, 0, self.weight_factor)
    }
}

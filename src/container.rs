use indexmap::IndexMap;
use tracing::debug;

use crate::histogram::Binning;

/// One named dimension of a [`CfContainer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub binning: Binning,
}

impl Axis {
    pub fn new(name: &str, binning: Binning) -> Self {
        Self {
            name: name.to_string(),
            binning,
        }
    }
}

/// A sparse, weighted N-dimensional container with one grid per processing step.
///
/// Each step (for example "generated", "reconstructed", "pid") shares the same axes. Only
/// occupied cells are stored, so high-dimensional containers stay small. Values outside an
/// axis are clipped into its edge bins.
#[derive(Debug, Clone, PartialEq)]
pub struct CfContainer {
    name: String,
    axes: Vec<Axis>,
    steps: Vec<String>,
    cells: Vec<IndexMap<Vec<usize>, f64>>,
    entries: Vec<u64>,
}

impl CfContainer {
    pub fn new<S: AsRef<str>>(name: &str, steps: &[S]) -> Self {
        let steps: Vec<String> = steps.iter().map(|s| s.as_ref().to_string()).collect();
        Self {
            name: name.to_string(),
            axes: Vec::new(),
            cells: vec![IndexMap::new(); steps.len()],
            entries: vec![0; steps.len()],
            steps,
        }
    }

    pub fn set_axes(&mut self, axes: Vec<Axis>) {
        //! Replace the axes. Existing contents no longer match the new grid and are cleared.
        self.axes = axes;
        self.cells.iter_mut().for_each(IndexMap::clear);
        self.entries.iter_mut().for_each(|n| *n = 0);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn n_dimensions(&self) -> usize {
        self.axes.len()
    }

    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn step_index(&self, step: &str) -> Option<usize> {
        self.steps.iter().position(|s| s == step)
    }

    pub fn fill(&mut self, values: &[f64], step: usize, weight: f64) -> bool {
        //! Add `weight` to the cell holding `values` in `step`.
        //!
        //! Returns `false` and leaves the container untouched if the step does not exist or the
        //! number of values differs from the number of axes.
        if step >= self.steps.len() || values.len() != self.axes.len() {
            debug!(
                container = %self.name,
                step,
                values = values.len(),
                axes = self.axes.len(),
                "fill does not match container layout"
            );
            return false;
        }
        let cell: Vec<usize> = self
            .axes
            .iter()
            .zip(values)
            .map(|(axis, value)| axis.binning.bin_index(*value))
            .collect();
        *self.cells[step].entry(cell).or_insert(0.0) += weight;
        self.entries[step] += 1;
        true
    }

    pub fn content(&self, step: usize, cell: &[usize]) -> f64 {
        self.cells
            .get(step)
            .and_then(|cells| cells.get(cell))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entries(&self, step: usize) -> u64 {
        self.entries.get(step).copied().unwrap_or(0)
    }

    pub fn integral(&self, step: usize) -> f64 {
        self.cells
            .get(step)
            .map_or(0.0, |cells| cells.values().sum())
    }

    pub fn project(&self, step: usize, axis: usize) -> Vec<f64> {
        //! Sum the contents of `step` onto a single axis.
        let Some(target) = self.axes.get(axis) else {
            return Vec::new();
        };
        let mut projection = vec![0.0; target.binning.n_bins()];
        if let Some(cells) = self.cells.get(step) {
            for (cell, weight) in cells {
                projection[cell[axis]] += weight;
            }
        }
        projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn container() -> CfContainer {
        let mut cont = CfContainer::new("electrons", &["mc", "reco"]);
        cont.set_axes(vec![
            Axis::new("pt", Binning::logarithmic(4, 0.1, 10.0)),
            Axis::new("charge", Binning::linear(2, -1.1, 1.1)),
        ]);
        cont
    }

    #[test]
    fn fills_go_to_the_right_step_and_cell() {
        let mut cont = container();
        assert!(cont.fill(&[2.0, 1.0], 1, 0.5));
        assert!(cont.fill(&[2.5, 1.0], 1, 1.0));
        assert!(cont.fill(&[0.2, -1.0], 0, 1.0));
        assert_relative_eq!(cont.content(1, &[2, 1]), 1.5);
        assert_relative_eq!(cont.content(0, &[0, 0]), 1.0);
        assert_eq!(cont.entries(1), 2);
        assert_eq!(cont.project(1, 0), vec![0.0, 0.0, 1.5, 0.0]);
        assert_eq!(cont.step_index("reco"), Some(1));
    }

    #[test]
    fn mismatched_fills_are_refused() {
        let mut cont = container();
        assert!(!cont.fill(&[1.0], 0, 1.0));
        assert!(!cont.fill(&[1.0, 1.0], 2, 1.0));
        assert_relative_eq!(cont.integral(0), 0.0);
    }
}

use crate::histogram::{Binning, Histogram1D, Histogram2D};
use crate::pid::PidResponse;
use crate::track::Track;

/// Quality-assurance histograms of the detector responses and track DCAs, split into all charged
/// tracks and the tracks selected as kaons.
///
/// Responses are plotted against the total momentum. A track without a response for a detector
/// or without a DCA is skipped for that histogram.
#[derive(Debug, Clone)]
pub struct TrackQa {
    tpc_all: Histogram2D,
    tpc_kaons: Histogram2D,
    tof_all: Histogram2D,
    tof_kaons: Histogram2D,
    dca_all: Histogram2D,
    dca_xy: Histogram1D,
    dca_z: Histogram1D,
}

impl Default for TrackQa {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackQa {
    pub fn new() -> Self {
        let response = || {
            Histogram2D::new(
                Binning::linear(120, 0.0, 6.0),
                Binning::linear(100, -10.0, 10.0),
            )
        };
        Self {
            tpc_all: response(),
            tpc_kaons: response(),
            tof_all: response(),
            tof_kaons: response(),
            dca_all: Histogram2D::new(
                Binning::linear(120, -3.0, 3.0),
                Binning::linear(140, -3.5, 3.5),
            ),
            dca_xy: Histogram1D::new(Binning::linear(120, -3.0, 3.0)),
            dca_z: Histogram1D::new(Binning::linear(140, -3.5, 3.5)),
        }
    }

    pub fn fill(&mut self, track: &Track, response: &dyn PidResponse, is_kaon: bool) {
        //! Record one track. `is_kaon` is the selector's verdict for it.
        let p = track.p();
        if let Some(n_sigma) = response.tpc_n_sigma(track) {
            self.tpc_all.fill(p, n_sigma);
            if is_kaon {
                self.tpc_kaons.fill(p, n_sigma);
            }
        }
        if let Some(n_sigma) = response.tof_n_sigma(track) {
            self.tof_all.fill(p, n_sigma);
            if is_kaon {
                self.tof_kaons.fill(p, n_sigma);
            }
        }
        if let Some(dca) = track.dca() {
            self.dca_all.fill(dca.xy, dca.z);
            if is_kaon {
                self.dca_xy.fill(dca.xy);
                self.dca_z.fill(dca.z);
            }
        }
    }

    pub fn tpc_all(&self) -> &Histogram2D {
        &self.tpc_all
    }
    pub fn tpc_kaons(&self) -> &Histogram2D {
        &self.tpc_kaons
    }
    pub fn tof_all(&self) -> &Histogram2D {
        &self.tof_all
    }
    pub fn tof_kaons(&self) -> &Histogram2D {
        &self.tof_kaons
    }
    pub fn dca_all(&self) -> &Histogram2D {
        &self.dca_all
    }
    /// Transverse DCA of selected kaons.
    pub fn dca_xy(&self) -> &Histogram1D {
        &self.dca_xy
    }
    /// Longitudinal DCA of selected kaons.
    pub fn dca_z(&self) -> &Histogram1D {
        &self.dca_z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::RecordedResponse;
    use crate::track::PidSignals;
    use approx::assert_relative_eq;

    #[test]
    fn kaon_histograms_only_see_selected_tracks() {
        let mut qa = TrackQa::new();
        let kaon = Track::from_momentum(0.6, 0.8, 0.0, 1)
            .with_pid(PidSignals {
                tpc_n_sigma: Some(0.5),
                tof_n_sigma: Some(-1.0),
                ..PidSignals::default()
            })
            .with_dca(0.1, -0.2);
        let pion = Track::from_momentum(0.6, 0.8, 0.0, -1).with_pid(PidSignals {
            tpc_n_sigma: Some(7.0),
            ..PidSignals::default()
        });
        qa.fill(&kaon, &RecordedResponse, true);
        qa.fill(&pion, &RecordedResponse, false);

        assert_eq!(qa.tpc_all().entries(), 2);
        assert_eq!(qa.tpc_kaons().entries(), 1);
        assert_eq!(qa.tof_all().entries(), 1);
        assert_eq!(qa.tof_kaons().entries(), 1);
        assert_eq!(qa.dca_all().entries(), 1);
        assert_eq!(qa.dca_xy().entries(), 1);

        let tpc = qa.tpc_kaons();
        let p_bin = tpc.x_binning().bin_index(kaon.p());
        let sigma_bin = tpc.y_binning().bin_index(0.5);
        assert_relative_eq!(tpc.content(p_bin, sigma_bin), 1.0);
        let z_bin = qa.dca_z().binning().bin_index(-0.2);
        assert_relative_eq!(qa.dca_z().content(z_bin), 1.0);
    }
}

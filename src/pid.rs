use std::fmt::Debug;

use crate::config::{DcaThresholds, PidConfig, PidStrategy};
use crate::track::Track;

/// Source of kaon-hypothesis detector responses for a track.
///
/// The selector never reaches for a global response object; whichever implementation is handed
/// to [`KaonSelector::new`] is the only one it consults. A [`None`] means the detector has no
/// usable response for the track.
pub trait PidResponse: Send + Sync + Debug {
    fn tpc_n_sigma(&self, track: &Track) -> Option<f64>;
    fn tof_n_sigma(&self, track: &Track) -> Option<f64>;
    fn bayesian_probability(&self, track: &Track) -> Option<f64>;
}

/// Reads the responses recorded on the [`Track`] by the boundary adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedResponse;

impl PidResponse for RecordedResponse {
    fn tpc_n_sigma(&self, track: &Track) -> Option<f64> {
        track.pid().tpc_n_sigma
    }
    fn tof_n_sigma(&self, track: &Track) -> Option<f64> {
        track.pid().tof_n_sigma
    }
    fn bayesian_probability(&self, track: &Track) -> Option<f64> {
        track.pid().bayesian_probability
    }
}

/// Decides whether a track is a decay-kaon candidate.
#[derive(Debug)]
pub struct KaonSelector {
    config: PidConfig,
    dca: Option<DcaThresholds>,
    response: Box<dyn PidResponse>,
}

impl KaonSelector {
    pub fn new<R: PidResponse + 'static>(
        config: PidConfig,
        dca: Option<DcaThresholds>,
        response: R,
    ) -> Self {
        Self {
            config,
            dca,
            response: Box::new(response),
        }
    }

    pub fn response(&self) -> &dyn PidResponse {
        self.response.as_ref()
    }

    pub fn select(&self, track: &Track) -> bool {
        //! `true` if the track passes both the PID and (when configured) the DCA cut.
        //!
        //! Missing detector information rejects the track.
        if self.config.require_tpc_standalone && !track.pid().tpc_standalone {
            return false;
        }
        self.passes_dca(track) && self.passes_pid(track)
    }

    pub fn passes_pid(&self, track: &Track) -> bool {
        let cuts = &self.config.thresholds;
        let pt = track.pt();
        if pt < cuts.min_pt {
            return false;
        }
        let tpc = self.response.tpc_n_sigma(track);
        match self.config.strategy {
            PidStrategy::TpcOnly => within(tpc, cuts.tpc_n_sigma),
            PidStrategy::Bayesian if pt < cuts.tpc_pt_max => within(tpc, cuts.tpc_n_sigma),
            PidStrategy::Bayesian if pt < cuts.tof_pt_max => {
                within(self.response.tof_n_sigma(track), cuts.tof_n_sigma)
                    && within(tpc, cuts.tpc_n_sigma_with_tof)
            }
            PidStrategy::Bayesian => self
                .response
                .bayesian_probability(track)
                .map_or(false, |prob| prob >= cuts.bayesian_probability),
        }
    }

    pub fn passes_dca(&self, track: &Track) -> bool {
        let Some(cuts) = self.dca else {
            return true;
        };
        let Some(dca) = track.dca() else {
            return false;
        };
        let pt = track.pt();
        if pt <= 0.0 {
            return false;
        }
        let xy_limit = (cuts.xy_constant + cuts.xy_slope / pt.powf(cuts.xy_power)).min(cuts.xy_max);
        dca.xy.abs() < xy_limit && dca.z.abs() < cuts.z_max
    }
}

fn within(n_sigma: Option<f64>, limit: f64) -> bool {
    n_sigma.map_or(false, |n| n.abs() < limit)
}

use std::io::Write;

use approx::assert_relative_eq;
use phiflow::prelude::*;

fn kaon(px: f64, py: f64, pz: f64, charge: i8) -> Track {
    Track::from_momentum(px, py, pz, charge).with_pid(PidSignals {
        tpc_n_sigma: Some(0.2),
        tof_n_sigma: Some(-0.4),
        bayesian_probability: Some(0.97),
        tpc_standalone: true,
    })
}

/// A K+ K- pair with a mass near the phi, plus one stray positive kaon.
fn phi_event(centrality: f64, vertex_z: f64) -> Event {
    let (sx, sy) = (0.127 * 0.6, 0.127 * 0.8);
    let boost = 0.7;
    Event::new(
        centrality,
        vertex_z,
        vec![
            kaon(boost + sx, sy, 0.05, 1),
            kaon(boost - sx, -sy, 0.05, -1),
            kaon(-0.4, 0.6, -0.3, 1),
        ],
    )
}

#[test]
fn end_to_end_from_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        centrality_classes = [0.0, 10.0, 30.0, 50.0]

        [events]
        centrality_min = 0.0
        centrality_max = 50.0
        vertex_range = 10.0

        [mass]
        bins = 50
        min = 0.99
        max = 1.09

        [mixing]
        pool_depth = 3
        min_events = 2
        min_tracks = 2
        centrality_bins = [0.0, 10.0, 30.0, 50.0]
        vertex_bins = [-10.0, 0.0, 10.0]
        "#
    )
    .unwrap();
    let config = AnalysisConfig::from_file(file.path()).unwrap();
    let mut analysis = PhiAnalysis::new(&config, RecordedResponse);

    let mut outcomes = Vec::new();
    for i in 0..6 {
        outcomes.push(analysis.process_event(&phi_event(15.0, -2.0 + 0.1 * f64::from(i))));
    }
    outcomes.push(analysis.process_event(&phi_event(70.0, 0.0)));

    assert_eq!(
        outcomes[6],
        EventOutcome::Rejected(RejectReason::CentralityOutOfRange)
    );
    let mixed: Vec<usize> = outcomes[..6]
        .iter()
        .map(|outcome| match outcome {
            EventOutcome::Processed(summary) => summary.mixed_pairs,
            EventOutcome::Rejected(_) => usize::MAX,
        })
        .collect();
    assert_eq!(mixed, vec![0, 0, 18, 27, 27, 27]);

    let stats = analysis.stats();
    assert_eq!(stats.events_seen, 7);
    assert_eq!(stats.processed, 6);
    assert_eq!(stats.kaons, 18);
    assert_eq!(stats.same_event_pairs.unlike, 12);
    assert_eq!(stats.same_event_pairs.like_positive, 6);

    let pool = analysis.pool().unwrap();
    let key = pool.classify(Some(15.0), Some(-1.5)).unwrap();
    assert_eq!(pool.pool(key).unwrap().n_events(), 3);

    // the K+ K- pair of every event lands in one bin, the stray pair overflows into the last
    let signal = MassKey {
        centrality_class: 1,
        charge: PairCharge::Unlike,
        origin: PairOrigin::SameEvent,
    };
    let hist = analysis.histograms().get(&signal).unwrap();
    let event = phi_event(15.0, 0.0);
    let mass = invariant_mass(&event.tracks[0], &event.tracks[1]);
    assert!(mass > 1.0 && mass < 1.03);
    let peak = hist.binning().bin_index(mass);
    assert_relative_eq!(hist.content(peak), 6.0);
    assert_relative_eq!(hist.content(49), 6.0);
    assert_relative_eq!(hist.integral(), 12.0);
}

#[test]
fn var_manager_fills_reconstructed_and_mc_steps() {
    let mut manager = VarManager::new("hfe");
    for name in ["pt", "eta", "phi", "charge", "centrality"] {
        manager.add_variable(name);
    }
    let mut container = CfContainer::new("tracks", &["mc", "reconstructed"]);
    manager.define_variables(&mut container);

    let track = Track::from_momentum(0.8, 0.6, 0.1, 1).with_label(11);
    let truth = McParticle {
        pt: 1.02,
        eta: 0.1,
        phi: 0.64,
        charge_thirds: 3,
        label: 11,
    };
    manager.new_track(Some(&track), Some(&truth), 3.0, 0, true);
    assert!(manager.fill_container(&mut container, 0, true, 1.0));
    assert!(manager.fill_container(&mut container, 1, false, 1.0));

    let pt_reco = container.project(1, 0);
    let pt_mc = container.project(0, 0);
    let pt_axis = &container.axes()[0].binning;
    assert_relative_eq!(pt_reco[pt_axis.bin_index(1.0)], 1.0);
    assert_relative_eq!(pt_mc[pt_axis.bin_index(1.02)], 1.0);
    let charge = container.project(1, 3);
    assert_eq!(charge, vec![0.0, 1.0]);
}

#[test]
fn flow_candidates_and_profiles_from_toml() {
    let config = AnalysisConfig::from_toml(
        r#"
        qa = true

        [mixing]
        background = "unlike_sign"
        min_events = 1
        min_tracks = 1

        [flow]
        "#,
    )
    .unwrap();
    let mut analysis = PhiAnalysis::new(&config, RecordedResponse);
    let planes = EventPlanes {
        second: SubEventPlanes {
            vzero_a: 0.1,
            vzero_c: 0.2,
            tpc: 0.15,
        },
        third: SubEventPlanes {
            vzero_a: 1.0,
            vzero_c: 1.2,
            tpc: 0.9,
        },
    };
    for _ in 0..2 {
        analysis.process_event(&phi_event(15.0, 1.0).with_event_planes(planes));
    }

    // only the K+ K- pair of the phi falls inside the default mass bands
    let candidates = analysis.flow_candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].pt_bin, 4);
    let bands = analysis.flow_selector().unwrap().group_by_band(candidates);
    assert_eq!(bands.iter().filter(|band| !band.is_empty()).count(), 1);

    // unlike-sign background only: each buffered kaon pairs with the opposite-charge current ones
    assert_eq!(analysis.stats().mixed_pairs.unlike, 4);
    assert_eq!(analysis.stats().mixed_pairs.like_positive, 0);

    let flow = analysis.flow().unwrap();
    let resolution = flow.resolution(3, Harmonic::Second, VzeroSide::A).unwrap();
    assert!(resolution > 0.9 && resolution <= 1.0);
    let v2 = flow
        .vn(&FlowKey {
            centrality_class: 3,
            harmonic: Harmonic::Second,
            side: VzeroSide::A,
        })
        .unwrap();
    assert_eq!(v2.entries(), 4);
    assert_eq!(analysis.qa().unwrap().tpc_kaons().entries(), 6);
}

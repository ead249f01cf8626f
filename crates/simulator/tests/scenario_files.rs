//! The scenario files shipped with the simulator.

use bdb_simulator::{Procedure, Scenario, ScenarioConfig};
use bdb_types::TerminalStatus;
use std::path::PathBuf;
use std::time::Duration;
use tracing_test::traced_test;

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[traced_test]
#[test]
fn test_shipped_scenarios_parse() {
    for name in ["steer-centralized.toml", "touchlink-fallback.toml"] {
        let config = ScenarioConfig::load(&scenario_path(name)).unwrap();
        assert!(!config.steps.is_empty(), "{name}");
    }
}

#[traced_test]
#[test]
fn test_steer_centralized_scenario_runs() {
    let config = ScenarioConfig::load(&scenario_path("steer-centralized.toml")).unwrap();
    let report = Scenario::new(config)
        .unwrap()
        .run(Duration::from_secs(600))
        .unwrap();

    assert!(report.all_completed());
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].procedure, Procedure::Steer);
    assert_eq!(report.steps[0].final_result(), Some(TerminalStatus::Success));
    assert_eq!(report.steps[1].procedure, Procedure::FindBind);
    assert!(report.steps[1].started_at >= report.steps[0].finished_at + Duration::from_secs(2));
}

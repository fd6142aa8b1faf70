//! Integration test: config-driven profiling with the powercap source on a
//! fake sysfs tree.

use std::fs;
use std::path::Path;
use std::time::Duration;
use wattprobe_harness::{open_session, run_profile, SessionConfig};

fn write_zone(dir: &Path, name: &str, energy: u64) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
    fs::write(dir.join("energy_uj"), format!("{}\n", energy)).unwrap();
    fs::write(dir.join("max_energy_range_uj"), "262143328850\n").unwrap();
}

fn rapl_config(root: &Path) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.telemetry.kind = "rapl".to_string();
    config.telemetry.device = root.display().to_string();
    config.collection.duration = Duration::from_millis(200);
    config.collection.settle_delay = Duration::from_millis(20);
    config.output.rails = vec!["package-0".to_string(), "dram".to_string()];
    config
}

#[test]
fn test_open_session_records_setup_phases() {
    let root = tempfile::tempdir().unwrap();
    write_zone(&root.path().join("intel-rapl:0"), "package-0", 1_000);

    let session = open_session(&rapl_config(root.path())).unwrap();
    let summary = session.timings().summary();

    assert!(summary.initialize.is_some());
    assert!(summary.allocate_buffers.is_some());
    assert_eq!(summary.run_count, 0);
    assert_eq!(session.parameters().in_out_size(), 8);
}

#[test]
fn test_unknown_kernel_fails_before_allocation() {
    let root = tempfile::tempdir().unwrap();
    write_zone(&root.path().join("intel-rapl:0"), "package-0", 1_000);

    let mut config = rapl_config(root.path());
    config.kernel.name = "autoencoder".to_string();
    let err = open_session(&config).unwrap_err();
    assert!(err.to_string().contains("autoencoder"));
}

#[test]
fn test_unsupported_element_type_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut config = rapl_config(root.path());
    config.kernel.result_type = "float64".to_string();
    assert!(open_session(&config).is_err());
}

#[test]
fn test_run_profile_writes_outputs() {
    let root = tempfile::tempdir().unwrap();
    let package = root.path().join("intel-rapl:0");
    write_zone(&package, "package-0", 5_000);
    write_zone(&package.join("intel-rapl:0:0"), "dram", 1_000);

    let out = tempfile::tempdir().unwrap();
    let json_path = out.path().join("telemetry.json");
    let csv_path = out.path().join("power.csv");

    let mut config = rapl_config(root.path());
    config.output.json_output = Some(json_path.display().to_string());
    config.output.csv_output = Some(csv_path.display().to_string());

    let outcome = run_profile(&config).unwrap();
    assert!(!outcome.buffer.is_empty());
    assert_eq!(outcome.table.len(), outcome.buffer.len());
    assert!(outcome.driver_iterations > 0);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(
        json["readings"].as_array().unwrap().len(),
        outcome.buffer.len()
    );

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(
        csv.lines().next().unwrap(),
        "time,Power,package-0 Power,dram Power"
    );
}

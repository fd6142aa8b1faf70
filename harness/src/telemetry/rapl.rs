//! Processor telemetry from Linux powercap (RAPL) energy counters
//!
//! Each zone exposes a cumulative `energy_uj` counter. Power is the energy
//! consumed since the previous query divided by the elapsed time. Package
//! zones and `dram` subzones count towards the total; other subzones
//! (`core`, `uncore`) are already part of their package and are reported as
//! rails only.

use crate::telemetry::{TelemetryError, TelemetrySource};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use wattprobe_shared::types::telemetry::{PowerReport, RailMetric};

/// Default sysfs location of the powercap tree
pub const DEFAULT_POWERCAP_ROOT: &str = "/sys/class/powercap";

const ZONE_PREFIX: &str = "intel-rapl:";

#[derive(Debug)]
struct RaplZone {
    name: String,
    energy_path: PathBuf,
    max_range_uj: u64,
    last_uj: u64,
    counts_toward_total: bool,
}

/// Telemetry source reading RAPL energy counters
#[derive(Debug)]
pub struct RaplSource {
    zones: Vec<RaplZone>,
    last_read: Instant,
}

fn read_u64(path: &Path) -> Result<u64, TelemetryError> {
    let text = fs::read_to_string(path)?;
    text.trim().parse().map_err(|_| {
        TelemetryError::unavailable(format!("{} does not hold a counter", path.display()))
    })
}

fn read_zone(dir: &Path, is_package: bool) -> Result<RaplZone, TelemetryError> {
    let name = fs::read_to_string(dir.join("name"))?.trim().to_string();
    let energy_path = dir.join("energy_uj");
    let last_uj = read_u64(&energy_path)?;
    // A missing range file only matters on wrap; fall back to no wrap handling
    let max_range_uj = read_u64(&dir.join("max_energy_range_uj")).unwrap_or(u64::MAX);
    let counts_toward_total = is_package || name == "dram";

    Ok(RaplZone {
        name,
        energy_path,
        max_range_uj,
        last_uj,
        counts_toward_total,
    })
}

fn zone_dirs(dir: &Path) -> Result<Vec<PathBuf>, TelemetryError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(ZONE_PREFIX))
                .unwrap_or(false)
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

impl RaplSource {
    /// Discover zones under `root` and take the baseline counter values
    ///
    /// # Errors
    ///
    /// `Unavailable` when no readable zone exists.
    pub fn open(root: &Path) -> Result<Self, TelemetryError> {
        let mut zones = Vec::new();

        // Top-level package zones: intel-rapl:N
        for package_dir in zone_dirs(root)? {
            let is_top_level = package_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.matches(':').count() == 1)
                .unwrap_or(false);
            if !is_top_level {
                continue;
            }

            match read_zone(&package_dir, true) {
                Ok(zone) => zones.push(zone),
                Err(e) => {
                    debug!("Skipping RAPL zone {}: {}", package_dir.display(), e);
                    continue;
                }
            }

            // Subzones: intel-rapl:N:M
            for sub_dir in zone_dirs(&package_dir)? {
                match read_zone(&sub_dir, false) {
                    Ok(zone) => zones.push(zone),
                    Err(e) => debug!("Skipping RAPL subzone {}: {}", sub_dir.display(), e),
                }
            }
        }

        if zones.is_empty() {
            return Err(TelemetryError::unavailable(format!(
                "no readable RAPL zones under {}",
                root.display()
            )));
        }

        debug!(
            "RAPL zones: {}",
            zones.iter().map(|z| z.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            zones,
            last_read: Instant::now(),
        })
    }

    /// Names of the discovered zones
    pub fn zone_names(&self) -> Vec<&str> {
        self.zones.iter().map(|z| z.name.as_str()).collect()
    }
}

/// Energy consumed between two counter values, accounting for one wrap
fn energy_delta(previous: u64, current: u64, max_range: u64) -> u64 {
    if current >= previous {
        current - previous
    } else {
        max_range.saturating_sub(previous).saturating_add(current)
    }
}

impl TelemetrySource for RaplSource {
    fn name(&self) -> &str {
        "rapl"
    }

    fn query(&mut self) -> Result<PowerReport, TelemetryError> {
        // Read every counter first so a failure leaves the baseline untouched
        let now = Instant::now();
        let counters = self
            .zones
            .iter()
            .map(|zone| read_u64(&zone.energy_path))
            .collect::<Result<Vec<u64>, _>>()?;

        let elapsed = now.duration_since(self.last_read).as_secs_f64();
        if elapsed <= 0.0 {
            return Err(TelemetryError::unavailable("no time elapsed since last query"));
        }

        let mut rails = BTreeMap::new();
        let mut total_power = 0.0;
        for (zone, current) in self.zones.iter_mut().zip(counters) {
            let delta_uj = energy_delta(zone.last_uj, current, zone.max_range_uj);
            zone.last_uj = current;

            let watts = delta_uj as f64 / 1_000_000.0 / elapsed;
            if zone.counts_toward_total {
                total_power += watts;
            }
            rails.insert(zone.name.clone(), RailMetric::power_only(watts));
        }
        self.last_read = now;

        Ok(PowerReport {
            max_power: None,
            total_power,
            power_warning: None,
            rails,
        })
    }
}

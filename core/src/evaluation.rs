use crate::config::Config;
use crate::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    pub mode: String,
    pub label: String,
    pub seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTiming {
    pub label: String,
    pub seconds: f64,
}

/// Serialized form of all recorded timings, grouped by mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalReport {
    pub plot: bool,
    pub modes: BTreeMap<String, Vec<RunTiming>>,
}

/// Thread-safe collector of wall-clock timings. Records nothing when disabled.
#[derive(Debug, Default)]
pub struct Evaluation {
    enabled: bool,
    plot: bool,
    records: Mutex<Vec<EvalRecord>>,
}

impl Evaluation {
    pub fn new(enabled: bool, plot: bool) -> Self {
        Self { enabled, plot, records: Mutex::new(Vec::new()) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.measure, config.plot)
    }

    pub fn disabled() -> Self {
        Self::new(false, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start(&self, mode: impl Display, label: impl Into<String>) -> Measurement<'_> {
        Measurement { eval: self, mode: mode.to_string(), label: label.into(), start: Instant::now() }
    }

    pub fn record(&self, mode: impl Display, label: impl Into<String>, seconds: f64) {
        if !self.enabled {
            return;
        }
        self.records.lock().push(EvalRecord { mode: mode.to_string(), label: label.into(), seconds });
    }

    pub fn records(&self) -> Vec<EvalRecord> {
        self.records.lock().clone()
    }

    pub fn report(&self) -> EvalReport {
        let mut modes: BTreeMap<String, Vec<RunTiming>> = BTreeMap::new();
        for r in self.records.lock().iter() {
            modes
                .entry(r.mode.clone())
                .or_default()
                .push(RunTiming { label: r.label.clone(), seconds: r.seconds });
        }
        EvalReport { plot: self.plot, modes }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.report())?;
        let mut f = File::create(path)?;
        f.write_all(json.as_bytes())?;
        tracing::info!(path = %path.display(), records = self.records.lock().len(), "wrote evaluation report");
        Ok(())
    }
}

/// Running timer; `stop` records it and returns the elapsed seconds.
pub struct Measurement<'a> {
    eval: &'a Evaluation,
    mode: String,
    label: String,
    start: Instant,
}

impl Measurement<'_> {
    pub fn stop(self) -> f64 {
        let seconds = self.start.elapsed().as_secs_f64();
        self.eval.record(&self.mode, self.label, seconds);
        seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_records_nothing() {
        let eval = Evaluation::disabled();
        let secs = eval.start("VANILLA", "q1").stop();
        assert!(secs >= 0.0);
        assert!(eval.records().is_empty());
    }

    #[test]
    fn report_groups_by_mode() {
        let eval = Evaluation::new(true, true);
        eval.record("VANILLA", "Med1", 3.0);
        eval.record("TIERED", "Med2", 4.0);
        eval.record("VANILLA", "Med3", 2.0);
        let report = eval.report();
        assert!(report.plot);
        assert_eq!(report.modes["VANILLA"].len(), 2);
        assert_eq!(report.modes["TIERED"][0], RunTiming { label: "Med2".into(), seconds: 4.0 });
    }

    #[test]
    fn writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval").join("report.json");
        let eval = Evaluation::new(true, false);
        eval.start("CLUSTER", "q").stop();
        eval.write(&path).unwrap();
        let report: EvalReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.modes["CLUSTER"].len(), 1);
    }
}

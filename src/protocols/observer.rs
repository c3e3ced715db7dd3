use crate::building_block::wire::WireId;
use crate::config::Role;
use crate::error::{ConfigurationError, Result};
use crate::protocols::yao_gc::Phase;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

/// What a party may disclose about a finished phase. Never carries keys,
/// pbits or the other party's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
  pub circuit: String,
  pub role: Role,
  pub phase: Phase,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gates: Option<usize>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub wires: Vec<WireId>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub bits: Vec<bool>,
}

impl PhaseReport {
  pub fn new(circuit: &str, role: Role, phase: Phase) -> Self {
    PhaseReport {
      circuit: circuit.to_string(),
      role,
      phase,
      gates: None,
      wires: vec![],
      bits: vec![],
    }
  }
}

pub trait PhaseObserver: Send + Sync {
  fn on_phase(&self, report: &PhaseReport) -> Result<()>;
}

pub struct NoopObserver;

impl PhaseObserver for NoopObserver {
  fn on_phase(&self, _report: &PhaseReport) -> Result<()> {
    Ok(())
  }
}

pub struct TracingObserver;

impl PhaseObserver for TracingObserver {
  fn on_phase(&self, report: &PhaseReport) -> Result<()> {
    info!(
      circuit = %report.circuit,
      role = %report.role,
      phase = ?report.phase,
      gates = ?report.gates,
      "phase complete"
    );
    Ok(())
  }
}

/// Writes `<role>_<phase>.json` files into a directory, one entry per
/// circuit. Only setup, inputs and result are dumped.
pub struct JsonDumpObserver {
  dir: PathBuf,
  dumps: Mutex<BTreeMap<String, BTreeMap<String, PhaseReport>>>,
}

impl JsonDumpObserver {
  pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir).map_err(ConfigurationError::from)?;
    Ok(JsonDumpObserver { dir, dumps: Mutex::new(BTreeMap::new()) })
  }

  fn file_name(report: &PhaseReport) -> Option<String> {
    let name = match (report.role, report.phase) {
      (Role::Garbler, Phase::Setup) => "setup",
      (Role::Evaluator, Phase::InputTransfer) => "inputs",
      (_, Phase::Done) => "result",
      _ => return None,
    };
    Some(format!("{}_{}.json", report.role, name))
  }
}

impl PhaseObserver for JsonDumpObserver {
  fn on_phase(&self, report: &PhaseReport) -> Result<()> {
    let Some(file_name) = Self::file_name(report) else {
      return Ok(());
    };

    // recover from a poisoned lock
    let mut dumps = self.dumps.lock().unwrap_or_else(|e| e.into_inner());
    let entries = dumps.entry(file_name.clone()).or_default();
    entries.insert(report.circuit.clone(), report.clone());

    let json = serde_json::to_string_pretty(entries).map_err(ConfigurationError::from)?;
    std::fs::write(self.dir.join(&file_name), json).map_err(ConfigurationError::from)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_json_dump() {
    let dir = tempfile::tempdir().unwrap();
    let observer = JsonDumpObserver::new(dir.path()).unwrap();

    let mut report = PhaseReport::new("adder", Role::Evaluator, Phase::Done);
    report.wires = vec![9, 10];
    report.bits = vec![true, false];
    observer.on_phase(&report).unwrap();
    observer.on_phase(&PhaseReport::new("adder", Role::Evaluator, Phase::Evaluation)).unwrap();
    observer.on_phase(&PhaseReport::new("other", Role::Evaluator, Phase::Done)).unwrap();

    let written = std::fs::read_to_string(dir.path().join("evaluator_result.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["adder"]["bits"], serde_json::json!([true, false]));
    assert_eq!(value["adder"]["phase"], "Done");
    assert!(value["other"].is_object());

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 1);
  }
}

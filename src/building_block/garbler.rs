use crate::building_block::{
  circuit::Circuit,
  garbled_table::GarbledTable,
  key_material::KeyMaterial,
  wire::WireId,
};
use crate::error::{ConfigurationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The part of a garbled circuit that is public: sent once to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledTables {
  pub tables: Vec<GarbledTable>,
}

#[derive(Debug, Clone)]
pub struct GarbledCircuit {
  pub circuit: Circuit,
  pub tables: GarbledTables,
  // retained by the garbler, never sent unless explicitly revealed
  output_pbits: BTreeMap<WireId, bool>,
}

impl GarbledCircuit {
  pub fn output_pbits(&self) -> &BTreeMap<WireId, bool> {
    &self.output_pbits
  }
}

pub struct CircuitGarbler();

impl CircuitGarbler {
  /// Garbles every gate in the circuit's topological order. Deterministic
  /// given the key material.
  pub fn garble(
    circuit: &Circuit,
    key_material: &KeyMaterial,
  ) -> Result<GarbledCircuit> {
    let tables = circuit.gates
      .iter()
      .map(|gate| GarbledTable::new(gate, key_material))
      .collect::<Result<Vec<GarbledTable>>>()?;

    let output_pbits = circuit.outputs
      .iter()
      .map(|w| {
        key_material.pbit(*w)
          .map(|p| (*w, p))
          .ok_or(ConfigurationError::DanglingWire { gate: *w, wire: *w })
      })
      .collect::<std::result::Result<BTreeMap<WireId, bool>, _>>()?;

    debug!(circuit = %circuit.id, gates = tables.len(), "garbled circuit");

    Ok(GarbledCircuit {
      circuit: circuit.clone(),
      tables: GarbledTables { tables },
      output_pbits,
    })
  }
}

use crate::building_block::{
  gate::Gate,
  wire::{Wire, WireId, WireOwner},
};
use crate::error::{ConfigurationError, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

// on-disk shape of a circuit description before validation
#[derive(Deserialize)]
struct RawCircuitFile {
  name: String,
  circuits: Vec<RawCircuit>,
}

#[derive(Deserialize)]
struct RawCircuit {
  id: String,
  #[serde(default)]
  alice: Vec<WireId>,
  #[serde(default)]
  bob: Vec<WireId>,
  out: Vec<WireId>,
  gates: Vec<RawGate>,
}

#[derive(Deserialize)]
struct RawGate {
  id: WireId,
  #[serde(rename = "type")]
  gate_type: String,
  #[serde(rename = "in", default)]
  inputs: Vec<WireId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitFile {
  pub name: String,
  pub circuits: Vec<Circuit>,
}

impl CircuitFile {
  pub fn from_json(json: &str) -> Result<Self> {
    let raw: RawCircuitFile = serde_json::from_str(json)
      .map_err(ConfigurationError::from)?;

    let circuits = raw.circuits
      .into_iter()
      .map(|c| {
        let gates = c.gates
          .into_iter()
          .map(|g| Ok(Gate::new(g.id, g.gate_type.parse()?, g.inputs)))
          .collect::<Result<Vec<Gate>>>()?;
        Circuit::new(c.id, c.alice, c.bob, c.out, gates)
      })
      .collect::<Result<Vec<Circuit>>>()?;

    if circuits.is_empty() {
      return Err(malformed(format!("{} contains no circuits", raw.name)));
    }
    Ok(CircuitFile { name: raw.name, circuits })
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path)
      .map_err(ConfigurationError::from)?;
    Self::from_json(&json)
  }

  pub fn get(&self, id: &str) -> Option<&Circuit> {
    self.circuits.iter().find(|c| c.id == id)
  }
}

fn malformed(msg: String) -> Error {
  ConfigurationError::MalformedCircuit(msg).into()
}

// a circuit received from the peer still goes through `Circuit::new`
#[derive(Deserialize)]
struct CircuitRepr {
  id: String,
  alice: Vec<WireId>,
  bob: Vec<WireId>,
  out: Vec<WireId>,
  gates: Vec<Gate>,
}

impl TryFrom<CircuitRepr> for Circuit {
  type Error = Error;

  fn try_from(repr: CircuitRepr) -> Result<Self> {
    Circuit::new(repr.id, repr.alice, repr.bob, repr.out, repr.gates)
  }
}

/// A validated boolean circuit whose gates are in topological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CircuitRepr")]
pub struct Circuit {
  pub id: String,
  #[serde(rename = "alice")]
  pub garbler_wires: Vec<WireId>,
  #[serde(rename = "bob")]
  pub evaluator_wires: Vec<WireId>,
  #[serde(rename = "out")]
  pub outputs: Vec<WireId>,
  pub gates: Vec<Gate>,
}

impl Circuit {
  pub fn new(
    id: String,
    garbler_wires: Vec<WireId>,
    evaluator_wires: Vec<WireId>,
    outputs: Vec<WireId>,
    gates: Vec<Gate>,
  ) -> Result<Self> {
    let mut inputs = HashSet::new();
    for w in garbler_wires.iter().chain(evaluator_wires.iter()) {
      if !inputs.insert(*w) {
        return Err(malformed(format!("input wire {} is declared twice", w)));
      }
    }

    let mut driven = HashSet::new();
    for gate in &gates {
      gate.check_arity()?;
      if inputs.contains(&gate.id) || !driven.insert(gate.id) {
        return Err(malformed(format!("wire {} is driven twice", gate.id)));
      }
    }

    for gate in &gates {
      if let Some(w) = gate.inputs.iter().find(|w| !inputs.contains(w) && !driven.contains(w)) {
        return Err(ConfigurationError::DanglingWire { gate: gate.id, wire: *w }.into());
      }
    }

    if outputs.is_empty() {
      return Err(malformed(format!("circuit {} has no outputs", id)));
    }
    if let Some(w) = outputs.iter().find(|w| !inputs.contains(w) && !driven.contains(w)) {
      return Err(malformed(format!("output wire {} is never driven", w)));
    }

    let gates = Self::sort_gates(gates, &inputs)?;

    Ok(Circuit {
      id,
      garbler_wires,
      evaluator_wires,
      outputs,
      gates,
    })
  }

  /// Re-runs validation on a circuit that did not come through `new`,
  /// e.g. one received from the other party.
  pub fn validated(self) -> Result<Self> {
    Self::new(
      self.id,
      self.garbler_wires,
      self.evaluator_wires,
      self.outputs,
      self.gates,
    )
  }

  // Kahn-style ordering that keeps the given order whenever it is already valid
  fn sort_gates(gates: Vec<Gate>, inputs: &HashSet<WireId>) -> Result<Vec<Gate>> {
    let mut available = inputs.clone();
    let mut sorted = Vec::with_capacity(gates.len());
    let mut pending = gates;

    while !pending.is_empty() {
      let mut blocked = Vec::new();
      let before = sorted.len();

      for gate in pending {
        if gate.inputs.iter().all(|w| available.contains(w)) {
          available.insert(gate.id);
          sorted.push(gate);
        } else {
          blocked.push(gate);
        }
      }

      if sorted.len() == before {
        let ids: Vec<String> = blocked.iter().map(|g| g.id.to_string()).collect();
        return Err(malformed(format!("gates {} form a cycle", ids.join(", "))));
      }
      pending = blocked;
    }
    Ok(sorted)
  }

  pub fn owner(&self, wire: WireId) -> WireOwner {
    if self.garbler_wires.contains(&wire) {
      WireOwner::GarblerInput
    } else if self.evaluator_wires.contains(&wire) {
      WireOwner::EvaluatorInput
    } else if self.outputs.contains(&wire) {
      WireOwner::Output
    } else {
      WireOwner::Internal
    }
  }

  /// Every wire of the circuit, ordered by id.
  pub fn wires(&self) -> Vec<Wire> {
    let ids: BTreeSet<WireId> = self.garbler_wires
      .iter()
      .chain(self.evaluator_wires.iter())
      .copied()
      .chain(self.gates.iter().map(|g| g.id))
      .collect();
    ids.into_iter().map(|id| Wire::new(id, self.owner(id))).collect()
  }

  /// Plaintext evaluation. Returns the output bits in `outputs` order.
  pub fn evaluate(
    &self,
    garbler_bits: &[bool],
    evaluator_bits: &[bool],
  ) -> Result<Vec<bool>> {
    check_len(self.garbler_wires.len(), garbler_bits.len())?;
    check_len(self.evaluator_wires.len(), evaluator_bits.len())?;

    let mut values: BTreeMap<WireId, bool> = self.garbler_wires
      .iter()
      .copied()
      .zip(garbler_bits.iter().copied())
      .chain(self.evaluator_wires.iter().copied().zip(evaluator_bits.iter().copied()))
      .collect();

    for gate in &self.gates {
      gate.check_arity()?;
      let ins = gate.inputs
        .iter()
        .map(|w| values.get(w).copied().ok_or(ConfigurationError::DanglingWire { gate: gate.id, wire: *w }))
        .collect::<std::result::Result<Vec<bool>, _>>()?;
      values.insert(gate.id, gate.gate_type.eval(&ins));
    }
    self.outputs
      .iter()
      .map(|w| values.get(w).copied().ok_or_else(|| malformed(format!("output wire {} is never driven", w))))
      .collect()
  }
}

pub(crate) fn check_len(expected: usize, got: usize) -> Result<()> {
  if expected != got {
    return Err(ConfigurationError::InputLengthMismatch { expected, got }.into());
  }
  Ok(())
}

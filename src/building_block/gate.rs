use crate::building_block::{
  gate_type::GateType,
  wire::WireId,
};
use crate::error::{ConfigurationError, Result};
use serde::{Deserialize, Serialize};

/// A gate of the circuit description. A gate is identified by the wire it
/// drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
  pub id: WireId,
  #[serde(rename = "type")]
  pub gate_type: GateType,
  #[serde(rename = "in")]
  pub inputs: Vec<WireId>,
}

impl Gate {
  pub fn new(
    id: WireId,
    gate_type: GateType,
    inputs: Vec<WireId>,
  ) -> Self {
    Gate {
      id,
      gate_type,
      inputs,
    }
  }

  pub fn check_arity(&self) -> Result<()> {
    if self.inputs.len() != self.gate_type.arity() {
      return Err(ConfigurationError::MalformedCircuit(format!(
        "gate {} ({}) has {} inputs, expected {}",
        self.id,
        self.gate_type,
        self.inputs.len(),
        self.gate_type.arity(),
      )).into());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;

  #[test]
  fn test_check_arity() {
    assert!(Gate::new(3, GateType::And, vec![1, 2]).check_arity().is_ok());
    assert!(Gate::new(3, GateType::Const1, vec![]).check_arity().is_ok());
    assert!(matches!(
      Gate::new(3, GateType::And, vec![1]).check_arity(),
      Err(Error::Configuration(ConfigurationError::MalformedCircuit(_))),
    ));
    assert!(Gate::new(3, GateType::Not, vec![1, 2]).check_arity().is_err());
  }
}

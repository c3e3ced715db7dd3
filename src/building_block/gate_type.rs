use crate::error::{ConfigurationError, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateType {
  And,
  Or,
  Xor,
  Nand,
  Nor,
  Xnor,
  Not,
  Buf,
  Const0,
  Const1,
}

impl GateType {
  pub fn arity(&self) -> usize {
    match self {
      GateType::Const0 | GateType::Const1 => 0,
      GateType::Not | GateType::Buf => 1,
      _ => 2,
    }
  }

  pub fn num_rows(&self) -> usize {
    1 << self.arity()
  }

  // inputs must have exactly arity() bits
  pub fn eval(&self, inputs: &[bool]) -> bool {
    match (self, inputs) {
      (GateType::Const0, []) => false,
      (GateType::Const1, []) => true,
      (GateType::Not, [a]) => !a,
      (GateType::Buf, [a]) => *a,
      (GateType::And, [a, b]) => a & b,
      (GateType::Or, [a, b]) => a | b,
      (GateType::Xor, [a, b]) => a ^ b,
      (GateType::Nand, [a, b]) => !(a & b),
      (GateType::Nor, [a, b]) => !(a | b),
      (GateType::Xnor, [a, b]) => !(a ^ b),
      _ => unreachable!("{} applied to {} inputs", self, inputs.len()),
    }
  }
}

impl FromStr for GateType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let gate_type = match s.to_ascii_uppercase().as_str() {
      "AND" => GateType::And,
      "OR" => GateType::Or,
      "XOR" => GateType::Xor,
      "NAND" => GateType::Nand,
      "NOR" => GateType::Nor,
      "XNOR" => GateType::Xnor,
      "NOT" => GateType::Not,
      "BUF" => GateType::Buf,
      "CONST0" => GateType::Const0,
      "CONST1" => GateType::Const1,
      _ => return Err(ConfigurationError::UnknownGateKind(s.to_string()).into()),
    };
    Ok(gate_type)
  }
}

impl fmt::Display for GateType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      GateType::And => "AND",
      GateType::Or => "OR",
      GateType::Xor => "XOR",
      GateType::Nand => "NAND",
      GateType::Nor => "NOR",
      GateType::Xnor => "XNOR",
      GateType::Not => "NOT",
      GateType::Buf => "BUF",
      GateType::Const0 => "CONST0",
      GateType::Const1 => "CONST1",
    };
    f.write_str(s)
  }
}

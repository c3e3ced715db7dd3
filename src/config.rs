use crate::building_block::{
  circuit::{check_len, CircuitFile},
  ot::{OtMode, MIN_MODULUS_BITS},
  util::to_bits,
};
use crate::error::{ConfigurationError, Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Garbler,
  Evaluator,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Role::Garbler => f.write_str("garbler"),
      Role::Evaluator => f.write_str("evaluator"),
    }
  }
}

/// Who decodes the output labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultMode {
  /// The evaluator returns output labels and the garbler decodes them.
  #[default]
  GarblerDecodes,
  /// The garbler hands out the output pbits and the evaluator decodes.
  RevealOutputPbits,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
  pub ot_mode: OtMode,
  pub result_mode: ResultMode,
  pub require_privacy: bool,
}

impl SessionConfig {
  pub fn validate(&self) -> Result<()> {
    match self.ot_mode {
      OtMode::Strong(params) if params.modulus_bits < MIN_MODULUS_BITS => {
        Err(ConfigurationError::InvalidOption(format!(
          "RSA modulus of {} bits is below the minimum of {}",
          params.modulus_bits, MIN_MODULUS_BITS,
        )).into())
      },
      OtMode::Weak(_) if self.require_privacy => {
        Err(Error::PrivacyViolationRisk(
          "weak oblivious transfer reveals the evaluator's input bits".to_string(),
        ))
      },
      _ => Ok(()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitSource {
  Path(PathBuf),
  Inline(String),
}

impl CircuitSource {
  pub fn load(&self) -> Result<CircuitFile> {
    match self {
      CircuitSource::Path(path) => CircuitFile::from_path(path),
      CircuitSource::Inline(json) => CircuitFile::from_json(json),
    }
  }
}

/// A party's private input, MSB first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyInput {
  Bits(Vec<bool>),
  Value { value: u64, bit_width: usize },
}

impl PartyInput {
  pub fn parse_bits(s: &str) -> Result<Vec<bool>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
      .filter(|t| !t.is_empty())
      .map(|t| match t {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ConfigurationError::InvalidOption(format!("{:?} is not a bit", t)).into()),
      })
      .collect()
  }

  pub fn bits(&self) -> Result<Vec<bool>> {
    match self {
      PartyInput::Bits(bits) => Ok(bits.clone()),
      PartyInput::Value { value, bit_width } => to_bits(*value, *bit_width),
    }
  }

  /// The bits for a circuit with `num_wires` inputs on this side.
  pub fn bits_for(&self, num_wires: usize) -> Result<Vec<bool>> {
    let bits = self.bits()?;
    check_len(num_wires, bits.len())?;
    Ok(bits)
  }
}

use crate::building_block::{
  key_material::KeyMaterial,
  wire::WireId,
  wire_label::WireLabel,
};
use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output pbits of a circuit. Whoever holds this table can decode the
/// output labels, so it only leaves the garbler when output pbits are
/// revealed on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDecodingTable {
  pub pbits: BTreeMap<WireId, bool>,
}

impl OutputDecodingTable {
  pub fn new(pbits: BTreeMap<WireId, bool>) -> Self {
    OutputDecodingTable { pbits }
  }

  pub fn decode_label(&self, wire: WireId, label: &WireLabel) -> Result<bool> {
    let pbit = self.pbits.get(&wire).ok_or(CryptoError::MissingLabel(wire))?;
    Ok(label.p ^ pbit)
  }

  /// Decodes the labels of `outputs`, in that order.
  pub fn decode(
    &self,
    outputs: &[WireId],
    labels: &BTreeMap<WireId, WireLabel>,
  ) -> Result<Vec<bool>> {
    outputs.iter()
      .map(|w| {
        let label = labels.get(w).ok_or(CryptoError::MissingLabel(*w))?;
        self.decode_label(*w, label)
      })
      .collect()
  }

  /// Garbler side decoding. Each returned label must be one of the two
  /// encodings of its wire, otherwise the evaluator did not compute it.
  pub fn authenticate_and_decode(
    key_material: &KeyMaterial,
    outputs: &[WireId],
    labels: &BTreeMap<WireId, WireLabel>,
  ) -> Result<Vec<bool>> {
    outputs.iter()
      .map(|w| {
        let label = labels.get(w).ok_or(CryptoError::MissingLabel(*w))?;
        key_material.authenticate(*w, label)
          .ok_or(CryptoError::UnauthenticatedLabel(*w).into())
      })
      .collect()
  }
}

use crate::building_block::{
  gate::Gate,
  key_material::KeyMaterial,
  util::xor_bytes,
  wire::WireId,
  wire_label::{Key, WireLabel, KEY_LEN, LABEL_LEN},
};
use crate::error::{ConfigurationError, CryptoError, Result};
use serde::{Deserialize, Serialize};
use sha3::{Sha3_256, Digest};

// key || color || zero block checked on decryption
pub const ROW_LEN: usize = 32;

pub type Row = [u8; ROW_LEN];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledTable {
  pub gate_id: WireId,
  table: Vec<Row>,
}

impl GarbledTable {
  fn compute_pad(
    keys: &[Key],
    gate_id: WireId,
    row: usize,
  ) -> Row {
    let mut hasher = Sha3_256::new();
    for k in keys {
      hasher.update(k);
    }
    hasher.update(gate_id.to_be_bytes());
    hasher.update([row as u8]);
    hasher.finalize().into()
  }

  fn plaintext(label: &WireLabel) -> Row {
    let mut row = [0u8; ROW_LEN];
    row[..LABEL_LEN].copy_from_slice(&label.serialize());
    row
  }

  // the color byte and the zero block must both survive decryption
  fn open(gate_id: WireId, row: usize, plain: &Row) -> Result<WireLabel> {
    let mismatch = CryptoError::DecryptionMismatch { gate: gate_id, row };
    if plain[LABEL_LEN..].iter().any(|b| *b != 0) || plain[KEY_LEN] > 1 {
      return Err(mismatch.into());
    }
    let mut k = [0u8; KEY_LEN];
    k.copy_from_slice(&plain[..KEY_LEN]);
    Ok(WireLabel::new(Key(k), plain[KEY_LEN] == 1))
  }

  pub fn row_index(colors: &[bool]) -> usize {
    colors.iter().fold(0usize, |acc, c| (acc << 1) | *c as usize)
  }

  pub fn new(gate: &Gate, key_material: &KeyMaterial) -> Result<Self> {
    gate.check_arity()?;
    let arity = gate.gate_type.arity();
    let mut table: Vec<Row> = vec![[0u8; ROW_LEN]; gate.gate_type.num_rows()];

    let dangling = |wire: WireId| ConfigurationError::DanglingWire { gate: gate.id, wire };

    // for all combinations of input values
    for combination in 0..(1usize << arity) {
      let values: Vec<bool> = (0..arity)
        .map(|i| (combination >> (arity - 1 - i)) & 1 == 1)
        .collect();

      let in_labels = gate.inputs
        .iter()
        .zip(values.iter())
        .map(|(w, v)| key_material.label(*w, *v).ok_or_else(|| dangling(*w)))
        .collect::<std::result::Result<Vec<WireLabel>, _>>()?;

      // compute the gate function and get the out label
      let v_c = gate.gate_type.eval(&values);
      let c_label = key_material.label(gate.id, v_c).ok_or_else(|| dangling(gate.id))?;

      // store the row so that rows are sorted by the input colors
      let colors: Vec<bool> = in_labels.iter().map(|l| l.p).collect();
      let index = Self::row_index(&colors);

      table[index] = if arity == 0 {
        Self::plaintext(&c_label)
      } else {
        let keys: Vec<Key> = in_labels.iter().map(|l| l.k).collect();
        let pad = Self::compute_pad(&keys, gate.id, index);
        xor_bytes(&pad, &Self::plaintext(&c_label))
      };
    }

    Ok(GarbledTable { gate_id: gate.id, table })
  }

  pub fn rows(&self) -> &[Row] {
    &self.table
  }

  #[cfg(test)]
  pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
    &mut self.table
  }

  pub fn decrypt_row(&self, row: usize, keys: &[Key]) -> Result<WireLabel> {
    let e = self.table.get(row).ok_or(CryptoError::UnexpectedRowShape {
      gate: self.gate_id,
      expected: row + 1,
      got: self.table.len(),
    })?;
    if keys.is_empty() {
      return Self::open(self.gate_id, row, e);
    }
    let pad = Self::compute_pad(keys, self.gate_id, row);
    Self::open(self.gate_id, row, &xor_bytes(&pad, e))
  }

  /// Decrypts the single row selected by the colors of the active input labels.
  pub fn decrypt(&self, gate: &Gate, inputs: &[WireLabel]) -> Result<WireLabel> {
    let expected = gate.gate_type.num_rows();
    if self.gate_id != gate.id || self.table.len() != expected || inputs.len() != gate.gate_type.arity() {
      return Err(CryptoError::UnexpectedRowShape {
        gate: gate.id,
        expected,
        got: self.table.len(),
      }.into());
    }
    let colors: Vec<bool> = inputs.iter().map(|l| l.p).collect();
    let keys: Vec<Key> = inputs.iter().map(|l| l.k).collect();
    self.decrypt_row(Self::row_index(&colors), &keys)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::building_block::gate_type::GateType;
  use crate::error::Error;
  use rand::SeedableRng;
  use rand_chacha::ChaCha20Rng;

  fn material() -> KeyMaterial {
    KeyMaterial::generate(&[1, 2, 3], &mut ChaCha20Rng::seed_from_u64(11)).unwrap()
  }

  fn check_gate(gate_type: GateType) {
    let km = material();
    let inputs: Vec<WireId> = [1, 2][..gate_type.arity()].to_vec();
    let gate = Gate::new(3, gate_type, inputs.clone());
    let table = GarbledTable::new(&gate, &km).unwrap();
    assert_eq!(table.rows().len(), gate_type.num_rows());

    for combination in 0..(1usize << gate_type.arity()) {
      let values: Vec<bool> = (0..gate_type.arity())
        .map(|i| (combination >> (gate_type.arity() - 1 - i)) & 1 == 1)
        .collect();
      let labels: Vec<WireLabel> = inputs.iter()
        .zip(values.iter())
        .map(|(w, v)| km.label(*w, *v).unwrap())
        .collect();
      let out = table.decrypt(&gate, &labels).unwrap();
      assert_eq!(out, km.label(3, gate_type.eval(&values)).unwrap(), "{}", gate_type);
    }
  }

  #[test]
  fn test_all_gate_types() {
    for gate_type in [
      GateType::And, GateType::Or, GateType::Xor, GateType::Nand,
      GateType::Nor, GateType::Xnor, GateType::Not, GateType::Buf,
      GateType::Const0, GateType::Const1,
    ] {
      check_gate(gate_type);
    }
  }

  #[test]
  fn test_wrong_keys_fail() {
    let km = material();
    let gate = Gate::new(3, GateType::And, vec![1, 2]);
    let table = GarbledTable::new(&gate, &km).unwrap();

    let a = km.label(1, true).unwrap();
    let b = km.label(2, false).unwrap();
    let expected = km.label(3, false).unwrap();
    let row = GarbledTable::row_index(&[a.p, b.p]);

    // swapped keys
    let res = table.decrypt_row(row, &[b.k, a.k]);
    assert!(matches!(res, Err(Error::CryptoInvariantViolation(CryptoError::DecryptionMismatch { .. }))));

    // right colors, the other key of wire 2
    let wrong_b = km.label(2, true).unwrap();
    match table.decrypt_row(row, &[a.k, wrong_b.k]) {
      Ok(label) => assert_ne!(label, expected),
      Err(e) => assert!(matches!(e, Error::CryptoInvariantViolation(_))),
    }

    // correct keys on any other row never give the expected label
    for other in (0..4).filter(|r| *r != row) {
      assert!(table.decrypt_row(other, &[a.k, b.k]).is_err());
    }
  }

  #[test]
  fn test_tampered_row_is_detected() {
    let km = material();
    let gate = Gate::new(3, GateType::Xor, vec![1, 2]);
    let mut table = GarbledTable::new(&gate, &km).unwrap();
    let a = km.label(1, false).unwrap();
    let b = km.label(2, true).unwrap();
    let row = GarbledTable::row_index(&[a.p, b.p]);
    table.table[row][ROW_LEN - 1] ^= 1;
    assert!(table.decrypt(&gate, &[a, b]).is_err());
  }

  #[test]
  fn test_dangling_wire() {
    let km = material();
    let gate = Gate::new(3, GateType::Or, vec![1, 7]);
    assert!(matches!(
      GarbledTable::new(&gate, &km),
      Err(Error::Configuration(ConfigurationError::DanglingWire { gate: 3, wire: 7 })),
    ));
  }

  #[test]
  fn test_row_shape_is_checked() {
    let km = material();
    let gate = Gate::new(3, GateType::Not, vec![1]);
    let table = GarbledTable::new(&gate, &km).unwrap();
    let as_and = Gate::new(3, GateType::And, vec![1, 2]);
    let labels = [km.label(1, false).unwrap(), km.label(2, false).unwrap()];
    assert!(matches!(
      table.decrypt(&as_and, &labels),
      Err(Error::CryptoInvariantViolation(CryptoError::UnexpectedRowShape { expected: 4, got: 2, .. })),
    ));
  }
}

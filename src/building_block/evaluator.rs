use crate::building_block::{
  circuit::Circuit,
  garbled_table::GarbledTable,
  wire::WireId,
  wire_label::WireLabel,
};
use crate::error::{CryptoError, Result};
use std::collections::BTreeMap;
use tracing::debug;

pub struct CircuitEvaluator();

impl CircuitEvaluator {
  /// Walks the gates in the garbler's order and returns the label reached on
  /// every output wire. `inputs` must hold a label for every input wire.
  pub fn evaluate(
    circuit: &Circuit,
    tables: &[GarbledTable],
    inputs: BTreeMap<WireId, WireLabel>,
  ) -> Result<BTreeMap<WireId, WireLabel>> {
    if tables.len() != circuit.gates.len() {
      return Err(CryptoError::UnexpectedRowShape {
        gate: circuit.gates.first().map(|g| g.id).unwrap_or_default(),
        expected: circuit.gates.len(),
        got: tables.len(),
      }.into());
    }

    let mut labels = inputs;
    for (gate, table) in circuit.gates.iter().zip(tables.iter()) {
      let ins = gate.inputs
        .iter()
        .map(|w| labels.get(w).copied().ok_or(CryptoError::MissingLabel(*w)))
        .collect::<std::result::Result<Vec<WireLabel>, _>>()?;
      let out = table.decrypt(gate, &ins)?;
      labels.insert(gate.id, out);
    }
    debug!(circuit = %circuit.id, gates = tables.len(), "evaluated circuit");

    circuit.outputs
      .iter()
      .map(|w| {
        labels.get(w)
          .map(|l| (*w, *l))
          .ok_or(CryptoError::MissingLabel(*w).into())
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::building_block::{
    garbler::CircuitGarbler,
    key_material::KeyMaterial,
    output_decoding_table::OutputDecodingTable,
    util::to_bits,
  };
  use crate::error::Error;
  use crate::test_circuits::{adder, constant_circuit};
  use rand::SeedableRng;
  use rand_chacha::ChaCha20Rng;

  fn input_labels(
    km: &KeyMaterial,
    circuit: &Circuit,
    garbler_bits: &[bool],
    evaluator_bits: &[bool],
  ) -> BTreeMap<WireId, WireLabel> {
    circuit.garbler_wires.iter().zip(garbler_bits)
      .chain(circuit.evaluator_wires.iter().zip(evaluator_bits))
      .map(|(w, b)| (*w, km.label(*w, *b).unwrap()))
      .collect()
  }

  fn run(circuit: &Circuit, garbler_bits: &[bool], evaluator_bits: &[bool], seed: u64) -> Vec<bool> {
    let km = KeyMaterial::for_circuit(circuit, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap();
    let garbled = CircuitGarbler::garble(circuit, &km).unwrap();
    let inputs = input_labels(&km, circuit, garbler_bits, evaluator_bits);
    let out = CircuitEvaluator::evaluate(circuit, &garbled.tables.tables, inputs).unwrap();
    OutputDecodingTable::new(garbled.output_pbits().clone())
      .decode(&circuit.outputs, &out)
      .unwrap()
  }

  #[test]
  fn test_matches_plaintext_evaluation() {
    let circuit = adder(3);
    for x in 0..8u64 {
      for y in 0..8u64 {
        let (a, b) = (to_bits(x, 3).unwrap(), to_bits(y, 3).unwrap());
        assert_eq!(run(&circuit, &a, &b, x * 8 + y), circuit.evaluate(&a, &b).unwrap());
      }
    }
  }

  #[test]
  fn test_two_bit_adder_scenario() {
    let circuit = adder(2);
    let out = run(&circuit, &[true, false], &[true, true], 41);
    assert_eq!(out, vec![true, false, true]);
    assert_eq!(out, circuit.evaluate(&[true, false], &[true, true]).unwrap());
  }

  #[test]
  fn test_constant_wire_circuit() {
    let circuit = constant_circuit();
    for b in [false, true] {
      assert_eq!(run(&circuit, &[], &[b], 42), circuit.evaluate(&[], &[b]).unwrap());
    }
  }

  #[test]
  fn test_missing_input_label() {
    let circuit = adder(2);
    let km = KeyMaterial::for_circuit(&circuit, &mut ChaCha20Rng::seed_from_u64(43)).unwrap();
    let garbled = CircuitGarbler::garble(&circuit, &km).unwrap();
    let mut inputs = input_labels(&km, &circuit, &[true, false], &[true, true]);
    inputs.remove(&circuit.evaluator_wires[0]);
    assert!(matches!(
      CircuitEvaluator::evaluate(&circuit, &garbled.tables.tables, inputs),
      Err(Error::CryptoInvariantViolation(CryptoError::MissingLabel(_))),
    ));
  }

  #[test]
  fn test_tables_from_another_run_fail() {
    let circuit = adder(2);
    let km = KeyMaterial::for_circuit(&circuit, &mut ChaCha20Rng::seed_from_u64(44)).unwrap();
    let other = KeyMaterial::for_circuit(&circuit, &mut ChaCha20Rng::seed_from_u64(45)).unwrap();
    let garbled = CircuitGarbler::garble(&circuit, &other).unwrap();
    let inputs = input_labels(&km, &circuit, &[false, true], &[true, false]);
    assert!(matches!(
      CircuitEvaluator::evaluate(&circuit, &garbled.tables.tables, inputs),
      Err(Error::CryptoInvariantViolation(CryptoError::DecryptionMismatch { .. })),
    ));
  }
}

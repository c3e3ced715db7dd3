use crate::building_block::{
  circuit::Circuit,
  gate::Gate,
  gate_type::GateType,
  wire::WireId,
};

pub const ADD_JSON: &str = include_str!("../circuits/add.json");

/// Ripple-carry adder over `width` bit operands, MSB first on both inputs and
/// on the `width + 1` outputs (carry out first). The carry into the lowest
/// bit comes from a CONST0 gate.
pub fn adder(width: usize) -> Circuit {
  let w = width as WireId;
  let garbler_wires: Vec<WireId> = (1..=w).collect();
  let evaluator_wires: Vec<WireId> = (w + 1..=2 * w).collect();

  let mut next = 2 * w + 1;
  let mut fresh = || {
    next += 1;
    next - 1
  };

  let mut gates = Vec::new();
  let mut carry = fresh();
  gates.push(Gate::new(carry, GateType::Const0, vec![]));

  let mut sums = Vec::with_capacity(width);
  for i in (0..width).rev() {
    let (a, b) = (garbler_wires[i], evaluator_wires[i]);
    let (x, s, t1, t2, c) = (fresh(), fresh(), fresh(), fresh(), fresh());
    gates.push(Gate::new(x, GateType::Xor, vec![a, b]));
    gates.push(Gate::new(s, GateType::Xor, vec![x, carry]));
    gates.push(Gate::new(t1, GateType::And, vec![a, b]));
    gates.push(Gate::new(t2, GateType::And, vec![x, carry]));
    gates.push(Gate::new(c, GateType::Or, vec![t1, t2]));
    sums.push(s);
    carry = c;
  }

  let outputs: Vec<WireId> = std::iter::once(carry)
    .chain(sums.into_iter().rev())
    .collect();

  Circuit::new(
    format!("{}-bit adder", width),
    garbler_wires,
    evaluator_wires,
    outputs,
    gates,
  ).unwrap()
}

/// Outputs are (carry, sum).
pub fn half_adder() -> Circuit {
  Circuit::new(
    "half adder".to_string(),
    vec![1],
    vec![2],
    vec![3, 4],
    vec![
      Gate::new(3, GateType::And, vec![1, 2]),
      Gate::new(4, GateType::Xor, vec![1, 2]),
    ],
  ).unwrap()
}

/// No garbler inputs. A CONST0 and a CONST1 wire feed every kind of
/// downstream gate together with the single evaluator bit.
pub fn constant_circuit() -> Circuit {
  Circuit::new(
    "constants".to_string(),
    vec![],
    vec![1],
    vec![3, 4, 5, 7, 8, 9],
    vec![
      Gate::new(2, GateType::Const0, vec![]),
      Gate::new(3, GateType::Or, vec![1, 2]),
      Gate::new(4, GateType::And, vec![1, 2]),
      Gate::new(5, GateType::Not, vec![2]),
      Gate::new(6, GateType::Const1, vec![]),
      Gate::new(7, GateType::Xor, vec![1, 6]),
      Gate::new(8, GateType::Nand, vec![2, 6]),
      Gate::new(9, GateType::Buf, vec![4]),
    ],
  ).unwrap()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::building_block::util::{from_bits, to_bits};

  #[test]
  fn test_helpers_are_wired_correctly() {
    let circuit = adder(2);
    assert_eq!(circuit.evaluate(&[true, false], &[true, true]).unwrap(), vec![true, false, true]);
    for x in 0..8u64 {
      for y in 0..8u64 {
        let out = adder(3).evaluate(&to_bits(x, 3).unwrap(), &to_bits(y, 3).unwrap()).unwrap();
        assert_eq!(from_bits(&out), x + y);
      }
    }
    assert_eq!(half_adder().evaluate(&[true], &[true]).unwrap(), vec![true, false]);
    assert_eq!(
      constant_circuit().evaluate(&[], &[true]).unwrap(),
      vec![true, false, true, false, true, false],
    );
  }
}

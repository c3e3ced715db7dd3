use crate::building_block::{
  circuit::Circuit,
  util::gen_random_binary_val,
  wire::WireId,
  wire_label::{Key, WireLabel, KEY_LEN},
};
use crate::error::Result;
use rand::{CryptoRng, RngCore};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
  pub k0: Key,
  pub k1: Key,
}

impl KeyPair {
  pub fn key(&self, value: bool) -> Key {
    if value { self.k1 } else { self.k0 }
  }
}

/// Per-wire key pairs and permutation bits of one garbling run.
///
/// Generated fresh by the garbler for every circuit run and dropped with the
/// session. Nothing here is ever sent as a whole.
#[derive(Clone)]
pub struct KeyMaterial {
  pairs: BTreeMap<WireId, KeyPair>,
  pbits: BTreeMap<WireId, bool>,
}

impl fmt::Debug for KeyMaterial {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("KeyMaterial")
      .field("wires", &self.pairs.len())
      .finish_non_exhaustive()
  }
}

fn gen_key<R: RngCore + CryptoRng>(
  rng: &mut R,
  seen: &mut HashSet<Key>,
) -> Result<Key> {
  loop {
    let mut k = [0u8; KEY_LEN];
    rng.try_fill_bytes(&mut k)?;
    let key = Key(k);
    // a repeated key is redrawn so that no two encodings ever coincide
    if seen.insert(key) {
      break Ok(key);
    }
  }
}

impl KeyMaterial {
  pub fn generate_keys<R: RngCore + CryptoRng>(
    wires: &[WireId],
    rng: &mut R,
  ) -> Result<BTreeMap<WireId, KeyPair>> {
    let mut seen = HashSet::with_capacity(wires.len() * 2);
    let mut pairs = BTreeMap::new();

    for w in wires {
      let k0 = gen_key(rng, &mut seen)?;
      let k1 = gen_key(rng, &mut seen)?;
      pairs.insert(*w, KeyPair { k0, k1 });
    }
    Ok(pairs)
  }

  pub fn generate_pbits<R: RngCore + CryptoRng>(
    wires: &[WireId],
    rng: &mut R,
  ) -> Result<BTreeMap<WireId, bool>> {
    wires.iter()
      .map(|w| Ok((*w, gen_random_binary_val(rng)?)))
      .collect()
  }

  pub fn generate<R: RngCore + CryptoRng>(
    wires: &[WireId],
    rng: &mut R,
  ) -> Result<Self> {
    let pairs = Self::generate_keys(wires, rng)?;
    let pbits = Self::generate_pbits(wires, rng)?;
    Ok(KeyMaterial { pairs, pbits })
  }

  pub fn for_circuit<R: RngCore + CryptoRng>(
    circuit: &Circuit,
    rng: &mut R,
  ) -> Result<Self> {
    let wires: Vec<WireId> = circuit.wires().iter().map(|w| w.id).collect();
    Self::generate(&wires, rng)
  }

  pub fn num_wires(&self) -> usize {
    self.pairs.len()
  }

  pub fn pair(&self, wire: WireId) -> Option<&KeyPair> {
    self.pairs.get(&wire)
  }

  pub fn pbit(&self, wire: WireId) -> Option<bool> {
    self.pbits.get(&wire).copied()
  }

  // color = pbit xor value
  pub fn label(&self, wire: WireId, value: bool) -> Option<WireLabel> {
    let pair = self.pairs.get(&wire)?;
    let pbit = self.pbits.get(&wire)?;
    Some(WireLabel::new(pair.key(value), pbit ^ value))
  }

  pub fn labels(&self, wire: WireId) -> Option<[WireLabel; 2]> {
    Some([self.label(wire, false)?, self.label(wire, true)?])
  }

  pub fn output_pbits(&self, outputs: &[WireId]) -> Option<BTreeMap<WireId, bool>> {
    outputs.iter()
      .map(|w| Some((*w, self.pbit(*w)?)))
      .collect()
  }

  /// Returns the value a label encodes, or `None` if the label is not one of
  /// the wire's two encodings.
  pub fn authenticate(&self, wire: WireId, label: &WireLabel) -> Option<bool> {
    [false, true]
      .into_iter()
      .find(|v| self.label(wire, *v).as_ref() == Some(label))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;
  use rand_chacha::ChaCha20Rng;

  fn material(seed: u64) -> KeyMaterial {
    let wires: Vec<WireId> = (0..64).collect();
    KeyMaterial::generate(&wires, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap()
  }

  #[test]
  fn test_color_is_pbit_xor_value() {
    let km = material(1);
    for w in 0..64 {
      let pbit = km.pbit(w).unwrap();
      assert_eq!(km.label(w, false).unwrap().p, pbit);
      assert_eq!(km.label(w, true).unwrap().p, !pbit);
    }
  }

  #[test]
  fn test_keys_are_unique() {
    let km = material(2);
    let mut keys = HashSet::new();
    for w in 0..64 {
      let pair = km.pair(w).unwrap();
      assert!(keys.insert(pair.k0));
      assert!(keys.insert(pair.k1));
    }
  }

  #[test]
  fn test_fresh_materials_never_collide() {
    let a = material(3);
    let b = KeyMaterial::generate(&(0..64).collect::<Vec<_>>(), &mut rand::rngs::OsRng).unwrap();
    for w in 0..64 {
      let (pa, pb) = (a.pair(w).unwrap(), b.pair(w).unwrap());
      assert_ne!(pa.k0, pb.k0);
      assert_ne!(pa.k1, pb.k1);
    }
  }

  #[test]
  fn test_same_seed_same_material() {
    let (a, b) = (material(4), material(4));
    for w in 0..64 {
      assert_eq!(a.labels(w), b.labels(w));
    }
  }

  #[test]
  fn test_pbits_are_not_constant() {
    let km = material(5);
    let ones = (0..64).filter(|w| km.pbit(*w).unwrap()).count();
    assert!(ones > 0 && ones < 64);
  }

  #[test]
  fn test_authenticate() {
    let km = material(6);
    let l1 = km.label(9, true).unwrap();
    assert_eq!(km.authenticate(9, &l1), Some(true));
    assert_eq!(km.authenticate(9, &km.label(9, false).unwrap()), Some(false));
    // a key of another wire is rejected
    assert_eq!(km.authenticate(10, &l1), None);
    // right key, flipped color is rejected
    assert_eq!(km.authenticate(9, &WireLabel::new(l1.k, !l1.p)), None);
  }

  struct BrokenRng;

  impl RngCore for BrokenRng {
    fn next_u32(&mut self) -> u32 { 0 }
    fn next_u64(&mut self) -> u64 { 0 }
    fn fill_bytes(&mut self, _dest: &mut [u8]) {}
    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
      Err(rand::Error::new("entropy source unavailable"))
    }
  }

  impl CryptoRng for BrokenRng {}

  #[test]
  fn test_insufficient_entropy() {
    let res = KeyMaterial::generate(&[1, 2], &mut BrokenRng);
    assert!(matches!(res, Err(crate::error::Error::InsufficientEntropy(_))));
  }
}

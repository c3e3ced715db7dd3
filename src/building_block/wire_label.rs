use crate::error::{CryptoError, Result};
use crate::building_block::wire::WireId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KEY_LEN: usize = 16;
pub const LABEL_LEN: usize = KEY_LEN + 1;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub [u8; KEY_LEN]);

impl fmt::Debug for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key({})", hex::encode(self.0))
  }
}

impl AsRef<[u8]> for Key {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

/// The active encoding of one wire value: a key and its public color
/// (`pbit XOR value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLabel {
  pub k: Key,    // key of length KEY_LEN
  pub p: bool,   // color
}

impl WireLabel {
  pub fn new(k: Key, p: bool) -> Self {
    WireLabel { k, p }
  }

  pub fn serialize(&self) -> [u8; LABEL_LEN] {
    let mut buf = [0u8; LABEL_LEN];
    buf[..KEY_LEN].copy_from_slice(&self.k.0);
    buf[KEY_LEN] = self.p as u8;
    buf
  }

  pub fn deserialize(wire: WireId, buf: &[u8; LABEL_LEN]) -> Result<Self> {
    let p = match buf[KEY_LEN] {
      0 => false,
      1 => true,
      _ => return Err(CryptoError::MalformedTransfer(wire).into()),
    };
    let mut k = [0u8; KEY_LEN];
    k.copy_from_slice(&buf[..KEY_LEN]);
    Ok(WireLabel { k: Key(k), p })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_serialize() {
    let label = WireLabel::new(Key([7u8; KEY_LEN]), true);
    let buf = label.serialize();
    assert_eq!(buf[KEY_LEN], 1);
    assert_eq!(WireLabel::deserialize(3, &buf).unwrap(), label);
  }

  #[test]
  fn test_deserialize_rejects_bad_color() {
    let mut buf = WireLabel::new(Key([0u8; KEY_LEN]), false).serialize();
    buf[KEY_LEN] = 2;
    assert!(WireLabel::deserialize(3, &buf).is_err());
  }

  #[test]
  fn test_key_debug_is_hex() {
    let key = Key([0xab; KEY_LEN]);
    assert_eq!(format!("{:?}", key), format!("Key({})", "ab".repeat(KEY_LEN)));
  }
}

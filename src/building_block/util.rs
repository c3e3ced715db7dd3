use crate::error::{ConfigurationError, Result};
use rand::{CryptoRng, RngCore};

pub fn gen_random_binary_val<R: RngCore + CryptoRng>(rng: &mut R) -> Result<bool> {
  let mut buf = [0u8; 1];
  rng.try_fill_bytes(&mut buf)?;
  Ok(buf[0] & 1 == 1)
}

pub fn xor_bytes<const N: usize>(lhs: &[u8; N], rhs: &[u8; N]) -> [u8; N] {
  std::array::from_fn(|i| lhs[i] ^ rhs[i])
}

// msb first, i.e. format!("{:0w$b}", value)
pub fn to_bits(value: u64, bit_width: usize) -> Result<Vec<bool>> {
  if bit_width == 0 || bit_width > 64 || (bit_width < 64 && value >> bit_width != 0) {
    return Err(ConfigurationError::ValueOutOfRange { value, bit_width }.into());
  }
  Ok((0..bit_width).rev().map(|i| (value >> i) & 1 == 1).collect())
}

pub fn from_bits(bits: &[bool]) -> u64 {
  bits.iter().fold(0u64, |acc, b| (acc << 1) | *b as u64)
}

pub fn bits_to_string(bits: &[bool]) -> String {
  bits.iter()
    .map(|b| if *b { "1" } else { "0" })
    .collect::<Vec<_>>()
    .join(" ")
}

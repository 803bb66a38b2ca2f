// Message framing and forward error correction
//
// The plain message is a fixed-layout 48-bit vector:
//   version (4) || id (20) || nonce (8) || crc (16)
// with every field packed MSB first. The CRC covers the first three fields.
// The whole message then goes through a rate-1/2 convolutional code, which
// a detector can decode with a Viterbi pass even when a fraction of the
// carried bits are flipped by re-encoding.

use crate::config::Config;
use crate::rng::{KeyStream, SALT_NONCE};
use crate::util::{pack_bits_msb, push_bits_msb};

// Generator polynomials of the rate-1/2, K=7 code (octal 171/133)
const CONV_G1: u8 = 0o171;
const CONV_G2: u8 = 0o133;
const CONV_TAIL_BITS: usize = 6;

// CRC-16/CCITT: polynomial 0x1021, initial register 0xFFFF,
// no reflection, no final xor
pub fn crc16_ccitt(data: &[u8]) -> u16 {
  let mut reg: u16 = 0xFFFF;
  for &byte in data {
    reg ^= (byte as u16) << 8;
    for _ in 0..8 {
      if reg & 0x8000 != 0 {
        reg = (reg << 1) ^ 0x1021;
      } else {
        reg <<= 1;
      }
    }
  }
  return reg;
}

// Rate-1/2 convolutional encoder. For each input bit the 7-bit state shifts
// left by one with the new bit in the LSB, then each generator contributes
// one parity bit. Six zero tail bits flush the state; their output is
// included, so the result is 2 * (input + 6) bits long.
pub fn conv_encode(bits: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(2 * (bits.len() + CONV_TAIL_BITS));
  let mut state: u8 = 0;

  for &bit in bits.iter().chain([0u8; CONV_TAIL_BITS].iter()) {
    assert!(bit <= 1);
    state = ((state << 1) | bit) & 0x7F;
    out.push((state & CONV_G1).count_ones() as u8 & 1);
    out.push((state & CONV_G2).count_ones() as u8 & 1);
  }

  return out;
}

// Build the 48-bit plain message for (id, key)
//
// The nonce is one key-seeded byte. It makes the coded bit pattern differ
// between keys even for equal ids, without costing id space.
pub fn build_message(config: &Config, id: u32, key: u64) -> Vec<u8> {
  let id = id & ((1 << config.id_bits) - 1);
  let nonce = KeyStream::new(key, SALT_NONCE).next_byte();

  let mut bits = Vec::with_capacity(config.message_bits());
  push_bits_msb(&mut bits, config.payload_version as u64, config.version_bits);
  push_bits_msb(&mut bits, id as u64, config.id_bits);
  push_bits_msb(&mut bits, nonce as u64, config.nonce_bits);

  let crc = crc16_ccitt(&pack_bits_msb(&bits));
  push_bits_msb(&mut bits, crc as u64, config.crc_bits);

  assert_eq!(bits.len(), config.message_bits());
  return bits;
}

// Plain message run through the convolutional code: the bits a tile carries
pub fn coded_bits(config: &Config, id: u32, key: u64) -> Vec<u8> {
  let coded = conv_encode(&build_message(config, id, key));
  assert_eq!(coded.len(), config.code_len);
  return coded;
}

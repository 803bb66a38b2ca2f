// Pipeline configuration
//
// One immutable value threaded through the pipeline. The release values are
// Config::default(); tests build their own to vary the tuning constants.
// Field widths and slot counts are tied together by invariants which
// validate() checks, so a tweaked config fails fast instead of producing an
// unrecoverable watermark.

#[derive(Clone, Debug)]
pub struct Config {
  // Pixel block size; the DCT kernel is fixed at 8x8
  pub block_size: usize,
  // Side of the logical bit tile, in blocks
  pub tile_side: usize,
  // DCT coefficient pairs as (row, col): the bit is the sign of
  // coeff(pair_a) - coeff(pair_b)
  pub pair_a: (usize, usize),
  pub pair_b: (usize, usize),
  // Sync pattern interleaved into the tile
  pub sync_word: u16,
  pub sync_bits: usize,
  // Message field widths, in bits
  pub version_bits: usize,
  pub id_bits: usize,
  pub nonce_bits: usize,
  pub crc_bits: usize,
  // Tile slots carrying coded payload bits, and codeword length
  pub coded_slots: usize,
  pub code_len: usize,
  // Period of the synchronization carrier grid, in pixels
  pub grid_period: usize,
  // Value of the version field
  pub payload_version: u8,
  // Perceptual mask: m = v / (v + knee), m_eff = margin * (floor + span * m)
  pub mask_knee: f32,
  pub mask_floor: f32,
  pub mask_span: f32,
}

impl Config {
  // Total bit slots in one tile
  pub fn tile_slots(&self) -> usize {
    self.tile_side * self.tile_side
  }

  // Width of the plain message, in bits
  pub fn message_bits(&self) -> usize {
    self.version_bits + self.id_bits + self.nonce_bits + self.crc_bits
  }

  pub fn validate(&self) {
    // The transform kernel is not configurable
    assert_eq!(self.block_size, crate::dct::BLOCK);
    assert_eq!(self.sync_bits + self.coded_slots, self.tile_slots());
    // Rate-1/2 code over the message plus six tail bits
    assert_eq!(self.code_len, 2 * (self.message_bits() + 6));
    assert!(self.sync_bits <= 16);
    assert!(self.pair_a.0 < self.block_size && self.pair_a.1 < self.block_size);
    assert!(self.pair_b.0 < self.block_size && self.pair_b.1 < self.block_size);
  }
}

impl Default for Config {
  fn default() -> Self {
    let config = Config {
      block_size: 8,
      tile_side: 16,
      pair_a: (2, 3),
      pair_b: (3, 2),
      sync_word: 0xA5C3,
      sync_bits: 16,
      version_bits: 4,
      id_bits: 20,
      nonce_bits: 8,
      crc_bits: 16,
      coded_slots: 240,
      code_len: 108,
      grid_period: 32,
      payload_version: 1,
      mask_knee: 300.0,
      mask_floor: 0.55,
      mask_span: 0.90,
    };
    config.validate();
    return config;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn release_config_is_consistent() {
    let config = Config::default();
    assert_eq!(config.tile_slots(), 256);
    assert_eq!(config.message_bits(), 48);
    assert_eq!(config.code_len, 108);
  }
}

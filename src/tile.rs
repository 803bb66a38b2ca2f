// Tile composition
//
// The coded message is laid out in a 16x16 logical tile of bit slots whose
// positions are scrambled by a key-derived permutation. Block (bx, by) of
// the luma plane carries the tile bit at (by mod 16, bx mod 16), so the
// same tile repeats across the whole image and a detector only needs one
// intact tile-sized region.

use crate::array2d::Array2D;
use crate::config::Config;
use crate::message;
use crate::rng::{KeyStream, SALT_SLOT_MAP, SALT_TILE_PERM};
use crate::util::push_bits_msb;

pub struct TileGrid {
  bits: Array2D<u8>,
}

impl TileGrid {
  // Compose the tile for (id, key): sync bits first, then the coded payload
  // bits through the slot map. The permutation is a bijection over all
  // slots, so every position is written exactly once.
  pub fn build(config: &Config, id: u32, key: u64) -> Self {
    let side = config.tile_side;
    let slots = config.tile_slots();

    let perm = KeyStream::new(key, SALT_TILE_PERM).permutation(slots);
    let slot_map = KeyStream::new(key, SALT_SLOT_MAP)
        .indices(config.coded_slots, config.code_len);
    let coded = message::coded_bits(config, id, key);

    let mut sync = Vec::with_capacity(config.sync_bits);
    push_bits_msb(&mut sync, config.sync_word as u64, config.sync_bits);

    let mut bits = Array2D::zeroed(side, side);
    for (j, &bit) in sync.iter().enumerate() {
      bits[(perm[j] / side, perm[j] % side)] = bit;
    }
    for s in 0..config.coded_slots {
      let slot = perm[config.sync_bits + s];
      // The slot map may repeat codeword bits; the duplicates carry the
      // same payload bit in several tile positions
      bits[(slot / side, slot % side)] = coded[slot_map[s]];
    }

    TileGrid { bits: bits }
  }

  // Bit carried by the block at block-index (bx, by)
  pub fn bit(&self, bx: usize, by: usize) -> u8 {
    self.bits[(by % self.bits.rows(), bx % self.bits.cols())]
  }
}

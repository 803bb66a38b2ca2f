// Keyed deterministic randomness
//
// Every random quantity in the pipeline (tile permutation, slot map, nonce,
// grid phases) is derived from the caller's 64-bit key through splitmix64,
// with a distinct salt per use so the streams are uncorrelated. The stream
// is the splitmix64 sequence itself: a pure bit mixer with no dependence on
// any library RNG, so the output is bit-identical on every platform.

// Salts for the individual key streams. These are ASCII-derived constants
// and must stay stable across releases: a detector re-derives the same
// streams from the same key.
pub const SALT_TILE_PERM: u64 = u64::from_be_bytes(*b"tileperm");
pub const SALT_SLOT_MAP: u64 = u64::from_be_bytes(*b"slotmap\0");
pub const SALT_NONCE: u64 = u64::from_be_bytes(*b"nonce\0\0\0");
pub const SALT_GRID_PHASE: u64 = u64::from_be_bytes(*b"gridphse");

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

// splitmix64 finalizer with the published constants
fn mix(mut z: u64) -> u64 {
  z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  z ^ (z >> 31)
}

pub struct KeyStream {
  state: u64,
}

impl KeyStream {
  pub fn new(key: u64, salt: u64) -> Self {
    // One full splitmix64 step over (key ^ salt): gamma advance, then the
    // finalizer. The result seeds the stream state.
    Self::from_seed(mix((key ^ salt).wrapping_add(GOLDEN_GAMMA)))
  }

  pub fn from_seed(seed: u64) -> Self {
    Self { state: seed }
  }

  pub fn next_u64(&mut self) -> u64 {
    self.state = self.state.wrapping_add(GOLDEN_GAMMA);
    mix(self.state)
  }

  // Uniform value in 0..bound via the 128-bit multiply-high reduction
  pub fn next_below(&mut self, bound: u64) -> u64 {
    assert!(bound > 0);
    (((self.next_u64() as u128) * (bound as u128)) >> 64) as u64
  }

  pub fn next_byte(&mut self) -> u8 {
    (self.next_u64() >> 56) as u8
  }

  // Uniform float in [0, 1) from the top 53 bits
  pub fn next_f64(&mut self) -> f64 {
    (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
  }

  // Uniform permutation of 0..len (Fisher-Yates)
  pub fn permutation(&mut self, len: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..len).collect();
    for i in (1..len).rev() {
      let j = self.next_below((i + 1) as u64) as usize;
      perm.swap(i, j);
    }
    return perm;
  }

  // `count` uniform indices in 0..bound, drawn with replacement
  pub fn indices(&mut self, count: usize, bound: usize) -> Vec<usize> {
    (0..count).map(|_| self.next_below(bound as u64) as usize).collect()
  }
}

// End-to-end properties of the embedding pipeline, exercised through the
// public API the server uses.

use tinymark::config::Config;
use tinymark::embed::{embed_bgr, EmbedParams};
use tinymark::frame::Frame;
use tinymark::message::{build_message, crc16_ccitt};
use tinymark::rng::KeyStream;
use tinymark::server::template_id;
use tinymark::util::pack_bits_msb;

// Deterministic pseudo-random BGR content so failures reproduce exactly
fn noise_bgr(width: usize, height: usize, seed: u64) -> Vec<u8> {
  let mut s = KeyStream::from_seed(seed);
  (0..width * height * 3).map(|_| s.next_byte()).collect()
}

fn luma_of(bgr: &[u8], width: usize, height: usize) -> Vec<u8> {
  Frame::from_bgr(bgr, width, height).y().data.to_vec()
}

#[test]
fn embedding_is_deterministic() {
  let config = Config::default();
  let params = EmbedParams::new(0, 0);
  let bgr = noise_bgr(512, 512, 1);

  let a = embed_bgr(&config, &params, &bgr, 512, 512);
  let b = embed_bgr(&config, &params, &bgr, 512, 512);
  assert_eq!(a, b);
}

#[test]
fn distinct_keys_give_distinct_luma() {
  let config = Config::default();
  let mut p1 = EmbedParams::new(1, 1);
  let mut p2 = EmbedParams::new(1, 2);
  p1.grid_amplitude = 0.0;
  p2.grid_amplitude = 0.0;

  let bgr = vec![128u8; 256 * 256 * 3];
  let a = embed_bgr(&config, &p1, &bgr, 256, 256);
  let b = embed_bgr(&config, &p2, &bgr, 256, 256);

  let la = luma_of(&a, 256, 256);
  let lb = luma_of(&b, 256, 256);
  let l1: u64 = la.iter().zip(lb.iter())
      .map(|(x, y)| (*x as i64 - *y as i64).unsigned_abs())
      .sum();
  assert!(l1 > 0);
}

// Mid-range content keeps every reconstructed channel inside the gamut, so
// chroma comparisons see pure quantization error rather than clamping
fn mid_noise_bgr(width: usize, height: usize, seed: u64) -> Vec<u8> {
  let mut s = KeyStream::from_seed(seed);
  (0..width * height * 3).map(|_| 112 + (s.next_byte() & 31)).collect()
}

#[test]
fn chroma_survives_the_round_trip() {
  let config = Config::default();
  let params = EmbedParams::new(42, 777);
  let bgr = mid_noise_bgr(128, 128, 2);

  let out = embed_bgr(&config, &params, &bgr, 128, 128);

  let input = Frame::from_bgr(&bgr, 128, 128);
  let output = Frame::from_bgr(&out, 128, 128);
  for i in 0..128 * 128 {
    let dcr = (input.cr().data[i] as i32 - output.cr().data[i] as i32).abs();
    let dcb = (input.cb().data[i] as i32 - output.cb().data[i] as i32).abs();
    assert!(dcr <= 2, "cr moved by {} at {}", dcr, i);
    assert!(dcb <= 2, "cb moved by {} at {}", dcb, i);
  }
}

#[test]
fn residual_strips_are_preserved() {
  // 255x255: the rightmost 7 columns and bottom 7 rows of luma belong to
  // no whole block and must come through modulo colorspace quantization
  let config = Config::default();
  let params = EmbedParams::new(42, 777);
  let bgr = noise_bgr(255, 255, 3);

  let out = embed_bgr(&config, &params, &bgr, 255, 255);

  for y in 0..255 {
    for x in 0..255 {
      if x < 248 && y < 248 {
        continue;
      }
      for c in 0..3 {
        let i = (y * 255 + x) * 3 + c;
        let d = (bgr[i] as i32 - out[i] as i32).abs();
        assert!(d <= 3, "channel {} moved by {} at ({}, {})", c, d, x, y);
      }
    }
  }
}

#[test]
fn residual_strip_luma_is_untouched() {
  // Same scenario on the luma plane. The plane itself is never written in
  // the strips; re-deriving luma through the BGR round trip can move a
  // value by one code step, no more
  let config = Config::default();
  let mut params = EmbedParams::new(42, 777);
  params.grid_amplitude = 0.0;
  let bgr = noise_bgr(255, 255, 3);

  let out = embed_bgr(&config, &params, &bgr, 255, 255);
  let la = luma_of(&bgr, 255, 255);
  let lb = luma_of(&out, 255, 255);

  for y in 0..255 {
    for x in 0..255 {
      if x >= 248 || y >= 248 {
        let d = (la[y * 255 + x] as i32 - lb[y * 255 + x] as i32).abs();
        assert!(d <= 1, "luma moved by {} at ({}, {})", d, x, y);
      }
    }
  }
}

#[test]
fn template_id_matches_scenario_shape() {
  let bgr = noise_bgr(255, 255, 3);
  let id = template_id(&bgr, 255, 255);
  assert_eq!(id.len(), 12);
  assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn re_embedding_is_a_contraction() {
  // Re-embedding the same (id, key) changes fewer pixels the second time:
  // most blocks already satisfy their coefficient relation
  let config = Config::default();
  let mut params = EmbedParams::new(9, 1234);
  params.grid_amplitude = 0.0;

  let bgr = noise_bgr(256, 256, 4);
  let once = embed_bgr(&config, &params, &bgr, 256, 256);
  let twice = embed_bgr(&config, &params, &once, 256, 256);

  let la = luma_of(&bgr, 256, 256);
  let lb = luma_of(&once, 256, 256);
  let lc = luma_of(&twice, 256, 256);

  let first: usize = la.iter().zip(lb.iter()).filter(|(x, y)| x != y).count();
  let second: usize = lb.iter().zip(lc.iter()).filter(|(x, y)| x != y).count();
  assert!(second < first, "second pass changed {} of {}", second, first);
}

#[test]
fn tiny_images_embed_successfully() {
  // Smaller than one logical tile (128x128 of luma): whatever whole
  // blocks exist are still modulated
  let config = Config::default();
  let mut params = EmbedParams::new(1, 1);
  params.grid_amplitude = 0.0;

  let bgr = vec![128u8; 24 * 16 * 3];
  let out = embed_bgr(&config, &params, &bgr, 24, 16);
  assert_eq!(out.len(), bgr.len());
  assert_ne!(out, bgr);
}

#[test]
fn message_checksum_round_trips() {
  // The CRC carried in the tail of the message matches a recomputation
  // over the packed leading fields, for a spread of (id, key) pairs
  let config = Config::default();
  for id in [0u32, 1, 7, 0xF_FFFF] {
    for key in [0u64, 1, u64::MAX] {
      let bits = build_message(&config, id, key);
      let crc = crc16_ccitt(&pack_bits_msb(&bits[..32]));
      let tail: u16 = bits[32..].iter().fold(0, |acc, &b| (acc << 1) | b as u16);
      assert_eq!(tail, crc);
    }
  }
}

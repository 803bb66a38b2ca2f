// Tiled application mode
//
// Instead of one pass over the whole image, the image is canonicalized by
// downscaling to a maximum long-side dimension, reflection-padded up to a
// multiple of a macro-tile, and each macro-tile is embedded independently
// with the full pipeline. Cropping the result anywhere that keeps one whole
// macro-tile keeps the whole payload. The output stays at the canonical
// (downscaled) size.

use crate::config::Config;
use crate::embed::{embed_bgr, EmbedParams};

#[derive(Clone, Copy, Debug)]
pub struct TiledParams {
  // Macro-tile side, in pixels
  pub tile_size: usize,
  // Longest output dimension after canonicalization
  pub max_dim: usize,
}

impl Default for TiledParams {
  fn default() -> Self {
    Self {
      tile_size: 400,
      max_dim: 1200,
    }
  }
}

// Mirror an out-of-range coordinate back into 0..len without repeating the
// edge sample (period 2*len - 2)
fn reflect_index(i: usize, len: usize) -> usize {
  if len == 1 {
    return 0;
  }
  let period = 2 * len - 2;
  let m = i % period;
  if m < len { m } else { period - m }
}

// Area-interpolation downscale of an interleaved BGR buffer so that the
// longer side is at most max_dim. Upscaling never happens.
pub fn downscale_area(bgr: &[u8], width: usize, height: usize,
                      max_dim: usize) -> (Vec<u8>, usize, usize) {
  let long_side = width.max(height);
  if long_side <= max_dim {
    return (bgr.to_vec(), width, height);
  }

  let out_w = (width * max_dim + long_side / 2) / long_side;
  let out_h = (height * max_dim + long_side / 2) / long_side;
  let out_w = out_w.max(1);
  let out_h = out_h.max(1);

  let mut out = vec![0u8; out_w * out_h * 3];
  for oy in 0..out_h {
    // Fractional source span covered by this output row
    let sy0 = oy as f64 * height as f64 / out_h as f64;
    let sy1 = (oy + 1) as f64 * height as f64 / out_h as f64;

    for ox in 0..out_w {
      let sx0 = ox as f64 * width as f64 / out_w as f64;
      let sx1 = (ox + 1) as f64 * width as f64 / out_w as f64;

      let mut acc = [0.0f64; 3];
      let mut total = 0.0f64;
      let mut y = sy0.floor() as usize;
      while (y as f64) < sy1 && y < height {
        let wy = (sy1.min((y + 1) as f64) - sy0.max(y as f64)).max(0.0);
        let mut x = sx0.floor() as usize;
        while (x as f64) < sx1 && x < width {
          let wx = (sx1.min((x + 1) as f64) - sx0.max(x as f64)).max(0.0);
          let w = wx * wy;
          let p = (y * width + x) * 3;
          acc[0] += w * bgr[p] as f64;
          acc[1] += w * bgr[p + 1] as f64;
          acc[2] += w * bgr[p + 2] as f64;
          total += w;
          x += 1;
        }
        y += 1;
      }

      let p = (oy * out_w + ox) * 3;
      for c in 0..3 {
        out[p + c] = (acc[c] / total).round().clamp(0.0, 255.0) as u8;
      }
    }
  }

  return (out, out_w, out_h);
}

// Reflection-pad a BGR buffer up to the next multiple of `tile` per axis
pub fn reflect_pad(bgr: &[u8], width: usize, height: usize,
                   tile: usize) -> (Vec<u8>, usize, usize) {
  let padded_w = width.next_multiple_of(tile);
  let padded_h = height.next_multiple_of(tile);
  if padded_w == width && padded_h == height {
    return (bgr.to_vec(), width, height);
  }

  let mut out = vec![0u8; padded_w * padded_h * 3];
  for y in 0..padded_h {
    let sy = reflect_index(y, height);
    for x in 0..padded_w {
      let sx = reflect_index(x, width);
      let src = (sy * width + sx) * 3;
      let dst = (y * padded_w + x) * 3;
      out[dst..dst + 3].copy_from_slice(&bgr[src..src + 3]);
    }
  }

  return (out, padded_w, padded_h);
}

// Embed into every macro-tile independently and return the canonicalized
// image (downscaled dimensions, padding cropped away)
pub fn embed_tiled(config: &Config, params: &EmbedParams, tiled: &TiledParams,
                   bgr: &[u8], width: usize, height: usize)
                   -> (Vec<u8>, usize, usize) {
  let (canon, canon_w, canon_h) = downscale_area(bgr, width, height, tiled.max_dim);
  let (mut padded, padded_w, padded_h) =
      reflect_pad(&canon, canon_w, canon_h, tiled.tile_size);

  let tiles_x = padded_w / tiled.tile_size;
  let tiles_y = padded_h / tiled.tile_size;
  log::debug!("tiled embed: {}x{} canonical, {}x{} tiles of {}",
              canon_w, canon_h, tiles_x, tiles_y, tiled.tile_size);

  let size = tiled.tile_size;
  let mut tile_buf = vec![0u8; size * size * 3];
  for ty in 0..tiles_y {
    for tx in 0..tiles_x {
      // Copy the tile out, run the single-image pipeline on it, paste back
      for row in 0..size {
        let src = ((ty * size + row) * padded_w + tx * size) * 3;
        let dst = row * size * 3;
        tile_buf[dst..dst + size * 3].copy_from_slice(&padded[src..src + size * 3]);
      }

      let marked = embed_bgr(config, params, &tile_buf, size, size);

      for row in 0..size {
        let dst = ((ty * size + row) * padded_w + tx * size) * 3;
        let src = row * size * 3;
        padded[dst..dst + size * 3].copy_from_slice(&marked[src..src + size * 3]);
      }
    }
  }

  // Crop the padding back off
  let mut out = vec![0u8; canon_w * canon_h * 3];
  for y in 0..canon_h {
    let src = (y * padded_w) * 3;
    out[y * canon_w * 3 .. (y + 1) * canon_w * 3]
        .copy_from_slice(&padded[src .. src + canon_w * 3]);
  }

  return (out, canon_w, canon_h);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rng::KeyStream;

  fn noise_bgr(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut s = KeyStream::from_seed(seed);
    (0..width * height * 3).map(|_| s.next_byte()).collect()
  }

  #[test]
  fn reflect_index_is_a_triangle_wave() {
    assert_eq!(reflect_index(0, 5), 0);
    assert_eq!(reflect_index(4, 5), 4);
    // Past the end: 5 -> 3, 6 -> 2 (no edge repeat)
    assert_eq!(reflect_index(5, 5), 3);
    assert_eq!(reflect_index(6, 5), 2);
    assert_eq!(reflect_index(8, 5), 0);
    // Wraps again for very deep padding
    assert_eq!(reflect_index(9, 5), 1);
    assert_eq!(reflect_index(3, 1), 0);
  }

  #[test]
  fn padding_is_symmetric_at_the_seam() {
    let bgr = noise_bgr(10, 6, 1);
    let (padded, pw, ph) = reflect_pad(&bgr, 10, 6, 8);
    assert_eq!((pw, ph), (16, 8));

    // Column 10 mirrors column 8, column 11 mirrors column 7
    for y in 0..6 {
      for c in 0..3 {
        assert_eq!(padded[(y * 16 + 10) * 3 + c], padded[(y * 16 + 8) * 3 + c]);
        assert_eq!(padded[(y * 16 + 11) * 3 + c], padded[(y * 16 + 7) * 3 + c]);
      }
    }
    // Row 6 mirrors row 4
    for x in 0..10 {
      for c in 0..3 {
        assert_eq!(padded[(6 * 16 + x) * 3 + c], padded[(4 * 16 + x) * 3 + c]);
      }
    }
  }

  #[test]
  fn already_aligned_image_is_not_padded() {
    let bgr = noise_bgr(16, 8, 2);
    let (padded, pw, ph) = reflect_pad(&bgr, 16, 8, 8);
    assert_eq!((pw, ph), (16, 8));
    assert_eq!(padded, bgr);
  }

  #[test]
  fn downscale_caps_the_long_side() {
    let bgr = noise_bgr(100, 40, 3);
    let (out, w, h) = downscale_area(&bgr, 100, 40, 50);
    assert_eq!((w, h), (50, 20));
    assert_eq!(out.len(), 50 * 20 * 3);
  }

  #[test]
  fn downscale_of_small_image_is_identity() {
    let bgr = noise_bgr(30, 20, 4);
    let (out, w, h) = downscale_area(&bgr, 30, 20, 50);
    assert_eq!((w, h), (30, 20));
    assert_eq!(out, bgr);
  }

  #[test]
  fn downscale_preserves_flat_regions() {
    let bgr = vec![200u8; 64 * 64 * 3];
    let (out, w, h) = downscale_area(&bgr, 64, 64, 16);
    assert_eq!((w, h), (16, 16));
    assert!(out.iter().all(|&v| v == 200));
  }

  #[test]
  fn tiled_embed_returns_canonical_dimensions() {
    let config = Config::default();
    let params = EmbedParams::new(8, 8);
    let mut tiled = TiledParams::default();
    tiled.tile_size = 64;
    tiled.max_dim = 120;

    // 300x200 downscales to 120x80, pads to 128x128, crops back to 120x80
    let bgr = noise_bgr(300, 200, 5);
    let (out, w, h) = embed_tiled(&config, &params, &tiled, &bgr, 300, 200);
    assert_eq!((w, h), (120, 80));
    assert_eq!(out.len(), 120 * 80 * 3);
  }

  #[test]
  fn tiles_are_embedded_independently() {
    // Two identical tiles side by side must come out identical
    let config = Config::default();
    let mut params = EmbedParams::new(3, 9);
    params.grid_amplitude = 0.0;
    let mut tiled = TiledParams::default();
    tiled.tile_size = 64;
    tiled.max_dim = 1000;

    let tile = noise_bgr(64, 64, 6);
    let mut bgr = Vec::new();
    for y in 0..64 {
      bgr.extend_from_slice(&tile[y * 64 * 3 .. (y + 1) * 64 * 3]);
      bgr.extend_from_slice(&tile[y * 64 * 3 .. (y + 1) * 64 * 3]);
    }

    let (out, w, h) = embed_tiled(&config, &params, &tiled, &bgr, 128, 64);
    assert_eq!((w, h), (128, 64));
    for y in 0..64 {
      let row = &out[y * 128 * 3 .. (y + 1) * 128 * 3];
      assert_eq!(&row[..64 * 3], &row[64 * 3..]);
    }
  }
}

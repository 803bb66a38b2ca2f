// The embedding pipeline
//
// embed_frame() is a pure function of (frame, params, config): split luma
// from chroma (done by the caller via Frame), add the synchronization
// carrier, compose the coded tile, then walk the luma plane in row-major
// 8x8 blocks and impress one tile bit per block by enforcing a sign
// relation between two mid-band DCT coefficients. Blocks whose relation
// already holds are left byte-identical. Trailing partial blocks are never
// touched.

use std::f64::consts::TAU;

use crate::config::Config;
use crate::dct::{fwd_dct_8x8, inv_dct_8x8, BLOCK};
use crate::frame::{Frame, Plane};
use crate::rng::{KeyStream, SALT_GRID_PHASE};
use crate::tile::TileGrid;

#[derive(Clone, Copy, Debug)]
pub struct EmbedParams {
  pub id: u32,
  pub key: u64,
  // Minimum enforced coefficient difference, in DCT units
  pub margin: f32,
  // Amplitude of the synchronization grid, in 8-bit luma units; 0 disables
  pub grid_amplitude: f32,
}

pub const DEFAULT_MARGIN: f32 = 14.0;
pub const DEFAULT_GRID_AMPLITUDE: f32 = 1.4;

impl EmbedParams {
  pub fn new(id: u32, key: u64) -> Self {
    Self {
      id: id,
      key: key,
      margin: DEFAULT_MARGIN,
      grid_amplitude: DEFAULT_GRID_AMPLITUDE,
    }
  }
}

// Embed into an interleaved 8-bit BGR buffer, returning a new buffer of the
// same dimensions
pub fn embed_bgr(config: &Config, params: &EmbedParams,
                 bgr: &[u8], width: usize, height: usize) -> Vec<u8> {
  let mut frame = Frame::from_bgr(bgr, width, height);
  embed_frame(config, params, &mut frame);
  return frame.to_bgr();
}

pub fn embed_frame(config: &Config, params: &EmbedParams, frame: &mut Frame) {
  log::debug!(
    "embedding id {:#x} into {}x{} luma ({}x{} whole blocks)",
    params.id & ((1 << config.id_bits) - 1),
    frame.width(), frame.height(),
    frame.width() / config.block_size, frame.height() / config.block_size,
  );

  if params.grid_amplitude > 0.0 {
    apply_sync_grid(config, params, frame.y_mut());
  }

  let grid = TileGrid::build(config, params.id, params.key);
  modulate_plane(config, params, &grid, frame.y_mut());
}

// Add the low-amplitude 2D cosine grid that gives a detector a geometric
// reference after resampling or cropping. Phases come from the key so the
// grid cannot be stripped without it.
fn apply_sync_grid(config: &Config, params: &EmbedParams, luma: &mut Plane) {
  let mut rng = KeyStream::new(params.key, SALT_GRID_PHASE);
  let phase_x = rng.next_f64() * TAU;
  let phase_y = rng.next_f64() * TAU;

  let period = config.grid_period;
  let half_amp = params.grid_amplitude * 0.5;

  // One period of each axis' cosine, scaled by half the amplitude
  let wave_x: Vec<f32> = (0..period)
      .map(|x| half_amp * ((TAU * x as f64 / period as f64 + phase_x).cos() as f32))
      .collect();
  let wave_y: Vec<f32> = (0..period)
      .map(|y| half_amp * ((TAU * y as f64 / period as f64 + phase_y).cos() as f32))
      .collect();

  for y in 0..luma.height {
    for x in 0..luma.width {
      let v = luma.get(x, y) as f32 + wave_x[x % period] + wave_y[y % period];
      luma.set(x, y, v.clamp(0.0, 255.0).round() as u8);
    }
  }
}

// Population variance of a block of u8 samples
fn block_variance(luma: &Plane, x0: usize, y0: usize) -> f32 {
  let n = (BLOCK * BLOCK) as f32;

  let mut sum = 0.0f32;
  for y in 0..BLOCK {
    for x in 0..BLOCK {
      sum += luma.get(x0 + x, y0 + y) as f32;
    }
  }
  let mean = sum / n;

  let mut acc = 0.0f32;
  for y in 0..BLOCK {
    for x in 0..BLOCK {
      let d = luma.get(x0 + x, y0 + y) as f32 - mean;
      acc += d * d;
    }
  }
  return acc / n;
}

fn modulate_plane(config: &Config, params: &EmbedParams,
                  grid: &TileGrid, luma: &mut Plane) {
  // Whole blocks only; the rightmost and bottom partial strips stay as-is
  let blocks_x = luma.width / config.block_size;
  let blocks_y = luma.height / config.block_size;

  for by in 0..blocks_y {
    for bx in 0..blocks_x {
      modulate_block(config, params, luma,
                     bx * config.block_size, by * config.block_size,
                     grid.bit(bx, by));
    }
  }
}

fn modulate_block(config: &Config, params: &EmbedParams,
                  luma: &mut Plane, x0: usize, y0: usize, bit: u8) {
  // Textured blocks absorb a larger margin invisibly; flat blocks get a
  // smaller one to avoid banding
  let variance = block_variance(luma, x0, y0);
  let mask = (variance / (variance + config.mask_knee)).clamp(0.0, 1.0);
  let margin = params.margin * (config.mask_floor + config.mask_span * mask);

  let mut block = [[0.0f32; BLOCK]; BLOCK];
  for y in 0..BLOCK {
    for x in 0..BLOCK {
      block[y][x] = luma.get(x0 + x, y0 + y) as f32 - 128.0;
    }
  }
  fwd_dct_8x8(&mut block);

  let ca = block[config.pair_a.0][config.pair_a.1];
  let cb = block[config.pair_b.0][config.pair_b.1];

  // Deficit against the required sign relation; nothing to do when the
  // relation already holds
  let deficit = if bit == 1 {
    cb + margin - ca
  } else {
    ca + margin - cb
  };
  if deficit <= 0.0 {
    return;
  }

  let half = deficit * 0.5;
  if bit == 1 {
    block[config.pair_a.0][config.pair_a.1] = ca + half;
    block[config.pair_b.0][config.pair_b.1] = cb - half;
  } else {
    block[config.pair_a.0][config.pair_a.1] = ca - half;
    block[config.pair_b.0][config.pair_b.1] = cb + half;
  }

  inv_dct_8x8(&mut block);
  for y in 0..BLOCK {
    for x in 0..BLOCK {
      let v = block[y][x] + 128.0;
      luma.set(x0 + x, y0 + y, v.clamp(0.0, 255.0).round() as u8);
    }
  }
}

// Basis for the 8x8 orthonormal type-II DCT
// Row i is c(i) * cos((2j+1) * i * pi / 16) for j = 0..8, with
// c(0) = sqrt(1/8) and c(i) = 1/2 otherwise. This matches the scaling used
// by OpenCV's dct() on 8x8 tiles.
//
// The table is a fixed set of f32 literals rather than being computed at
// startup, so the transform produces identical bits on every platform
// regardless of the local libm.
pub const DCT8_BASIS: [[f32; 8]; 8] = [
  [0.35355338, 0.35355338, 0.35355338, 0.35355338, 0.35355338, 0.35355338, 0.35355338, 0.35355338],
  [0.49039263, 0.4157348, 0.27778512, 0.09754516, -0.09754516, -0.27778512, -0.4157348, -0.49039263],
  [0.46193975, 0.19134171, -0.19134171, -0.46193975, -0.46193975, -0.19134171, 0.19134171, 0.46193975],
  [0.4157348, -0.09754516, -0.49039263, -0.27778512, 0.27778512, 0.49039263, 0.09754516, -0.4157348],
  [0.35355338, -0.35355338, -0.35355338, 0.35355338, 0.35355338, -0.35355338, -0.35355338, 0.35355338],
  [0.27778512, -0.49039263, 0.09754516, 0.4157348, -0.4157348, -0.09754516, 0.49039263, -0.27778512],
  [0.19134171, -0.46193975, 0.46193975, -0.19134171, -0.19134171, 0.46193975, -0.46193975, 0.19134171],
  [0.09754516, -0.27778512, 0.4157348, -0.49039263, 0.49039263, -0.4157348, 0.27778512, -0.09754516],
];

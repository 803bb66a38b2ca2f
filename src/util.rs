use byteorder::WriteBytesExt;

// Append the low `nbits` of `value` to a bit vector, most significant bit
// first. Each output element is 0 or 1
pub fn push_bits_msb(out: &mut Vec<u8>, value: u64, nbits: usize) {
  assert!(nbits <= 64);
  assert!(nbits == 64 || (value >> nbits) == 0);

  for i in (0..nbits).rev() {
    out.push(((value >> i) & 1) as u8);
  }
}

// Pack a bit vector (one bit per element, MSB first) into bytes
// The final byte is left-justified if the bit count is not a multiple of 8
pub fn pack_bits_msb(bits: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity((bits.len() + 7) / 8);
  for chunk in bits.chunks(8) {
    let mut byte = 0u8;
    for (i, &bit) in chunk.iter().enumerate() {
      assert!(bit <= 1);
      byte |= bit << (7 - i);
    }
    out.write_u8(byte).unwrap();
  }
  return out;
}

// SPDX-License-Identifier: LGPL-2.1

//! Differential decoder for entropy-coded pixel payloads.
//!
//! The payload is a lossless-JPEG-style scheme: each Huffman leaf is a
//! magnitude category (a bit length), followed by that many raw bits
//! forming a signed difference against a predictor. Frame geometry and the
//! category table come from the caller; marker parsing and lossy JPEG are
//! out of scope.

use crate::huffman::HuffmanTree;
use crate::pumps::{Bitstream, EntropyError, Result};

/// Decode one signed differential value: magnitude category from the
/// tree, then exactly that many raw bits, sign-extended. A raw value
/// below 2^(len-1) encodes a negative difference.
#[inline(always)]
pub fn decode_diff(dht: &HuffmanTree<u16>, pump: &mut Bitstream<'_>) -> Result<i32> {
  let len = *dht.decode_next(pump)? as u32;
  if len == 0 {
    return Ok(0);
  }
  if len == 16 {
    // Category 16 carries no magnitude bits, the difference is fixed.
    return Ok(-32768);
  }
  let bits = pump.read_bits(len)? as i32;
  if bits < (1 << (len - 1)) {
    Ok(bits - (1 << len) + 1)
  } else {
    Ok(bits)
  }
}

/// Decoder for one interleaved-component differential frame.
///
/// Produces the per-slice sample sequence later scattered by
/// [`crate::sensor::unslice`].
pub struct LosslessDecompressor {
  dht: HuffmanTree<u16>,
  width: usize,
  height: usize,
  components: usize,
  precision: u32,
}

impl LosslessDecompressor {
  pub fn new(dht: HuffmanTree<u16>, width: usize, height: usize, components: usize, precision: u32) -> Result<Self> {
    if width == 0 || height == 0 {
      return Err(EntropyError::InvalidFrame(format!("empty frame {}x{}", width, height)));
    }
    if components == 0 || components > 4 {
      return Err(EntropyError::InvalidFrame(format!("unsupported component count {}", components)));
    }
    if precision == 0 || precision > 16 {
      return Err(EntropyError::InvalidFrame(format!("unsupported sample precision {}", precision)));
    }
    if width % components != 0 {
      return Err(EntropyError::InvalidFrame(format!("width {} not divisible by {} components", width, components)));
    }
    Ok(Self {
      dht,
      width,
      height,
      components,
      precision,
    })
  }

  /// Decode `width * height` samples from `src`.
  ///
  /// First pixel of the frame predicts from `1 << (precision - 1)`;
  /// column 0 predicts from the first pixel of the previous row, every
  /// other pixel from its left neighbor of the same component.
  pub fn decode(&self, src: &[u8]) -> Result<Vec<u16>> {
    let mut pump = Bitstream::new(src);
    let mut out = vec![0_u16; self.width * self.height];
    let base_prediction = 1_i32 << (self.precision - 1);

    for c in 0..self.components {
      out[c] = (base_prediction + decode_diff(&self.dht, &mut pump)?) as u16;
    }

    for row in 0..self.height {
      let startcol = if row == 0 { self.components } else { 0 };
      for col in (startcol..self.width).step_by(self.components) {
        for c in 0..self.components {
          let prediction: i32 = if col == 0 {
            out[(row - 1) * self.width + c] as i32
          } else {
            out[row * self.width + (col - self.components) + c] as i32
          };
          let diff = decode_diff(&self.dht, &mut pump)?;
          out[row * self.width + col + c] = (prediction + diff) as u16;
        }
      }
    }

    Ok(out)
  }
}

// SPDX-License-Identifier: LGPL-2.1

//! Bit-level access to entropy-coded payloads.
//!
//! `Bitstream` is a forward-only MSB-first reader over an immutable byte
//! buffer. Once the backing buffer runs dry the stream is conclusively
//! exhausted: no partial bits are returned and the cursor never rewinds.

use thiserror::Error;

/// Error variants for the entropy decoding engine (bitstream + Huffman walk).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntropyError {
  /// The backing buffer ran out of bits mid-read.
  #[error("Bit read failed, stream is exhausted")]
  BitsExhausted,

  /// A Huffman walk hit a node with no child for the next bit.
  /// Carries the partial bit sequence and its length read so far.
  #[error("Unknown code {code:0len$b} ({len} bits)")]
  UnknownCode { code: u64, len: usize },

  /// A code inserted into a Huffman tree exceeds the configured
  /// maximum length (or has zero length).
  #[error("Invalid code length {len}, maximum is {max}")]
  InvalidCodeLen { len: u32, max: u32 },

  /// Frame geometry or precision the differential decoder cannot handle.
  #[error("Invalid frame: {0}")]
  InvalidFrame(String),
}

pub type Result<T> = std::result::Result<T, EntropyError>;

/// Sequential bit reader, most-significant-bit first.
///
/// Holds a one-byte lookahead buffer that is refilled lazily from the
/// backing slice.
#[derive(Debug, Copy, Clone)]
pub struct Bitstream<'a> {
  buffer: &'a [u8],
  pos: usize,
  bitbuf: u8,
  nbits: u32,
}

impl<'a> Bitstream<'a> {
  pub fn new(src: &'a [u8]) -> Bitstream<'a> {
    Bitstream {
      buffer: src,
      pos: 0,
      bitbuf: 0,
      nbits: 0,
    }
  }

  /// Bits still obtainable from lookahead plus backing buffer.
  pub fn remaining_bits(&self) -> usize {
    (self.buffer.len() - self.pos) * 8 + self.nbits as usize
  }

  /// Read the next single bit (0 or 1).
  #[inline(always)]
  pub fn read_bit(&mut self) -> Result<u32> {
    if self.nbits == 0 {
      if self.pos >= self.buffer.len() {
        return Err(EntropyError::BitsExhausted);
      }
      self.bitbuf = self.buffer[self.pos];
      self.pos += 1;
      self.nbits = 8;
    }
    self.nbits -= 1;
    Ok(((self.bitbuf >> self.nbits) & 1) as u32)
  }

  /// Accumulate `num` bits MSB-first into an unsigned integer, `num` up
  /// to 64. If fewer than `num` bits remain the call fails and no bits
  /// are consumed or returned.
  #[inline(always)]
  pub fn read_bits(&mut self, num: u32) -> Result<u64> {
    debug_assert!(num <= 64);
    if self.remaining_bits() < num as usize {
      return Err(EntropyError::BitsExhausted);
    }
    let mut val: u64 = 0;
    for _ in 0..num {
      val = (val << 1) | self.read_bit()? as u64;
    }
    Ok(val)
  }
}

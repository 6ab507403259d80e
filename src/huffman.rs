// SPDX-License-Identifier: LGPL-2.1

//! Generic Huffman decoding over a [`Bitstream`].
//!
//! The tree is a binary trie held in an arena of nodes referenced by index,
//! so nodes carry no owning pointers or back-references. It is built up
//! front by inserting `(code, code length, payload)` triples and is not
//! mutated during decoding. The inserted codes must form a valid prefix
//! code; the structure does not verify this and decoding garbage is the
//! result if they don't.

use crate::pumps::{Bitstream, EntropyError, Result};

const DEFAULT_MAX_CODE_LEN: u32 = 16;

#[derive(Debug, Clone)]
struct Node<T> {
  children: [Option<usize>; 2],
  payload: Option<T>,
}

impl<T> Node<T> {
  fn empty() -> Self {
    Self {
      children: [None, None],
      payload: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct HuffmanTree<T> {
  arena: Vec<Node<T>>,
  max_code_len: u32,
}

impl<T> Default for HuffmanTree<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> HuffmanTree<T> {
  pub fn new() -> Self {
    Self::with_max_code_len(DEFAULT_MAX_CODE_LEN)
  }

  pub fn with_max_code_len(max_code_len: u32) -> Self {
    Self {
      arena: vec![Node::empty()],
      max_code_len,
    }
  }

  /// Insert a root-to-leaf path of `code_len` edges. Each edge selects
  /// the 0- or 1-child from successive bits of `code`, MSB first;
  /// intermediate nodes are created as needed and the final node becomes
  /// a leaf holding `payload`.
  pub fn insert(&mut self, code: u32, code_len: u32, payload: T) -> Result<()> {
    if code_len == 0 || code_len > self.max_code_len {
      return Err(EntropyError::InvalidCodeLen {
        len: code_len,
        max: self.max_code_len,
      });
    }
    let mut node = 0;
    for shift in (0..code_len).rev() {
      let bit = ((code >> shift) & 1) as usize;
      node = match self.arena[node].children[bit] {
        Some(child) => child,
        None => {
          self.arena.push(Node::empty());
          let child = self.arena.len() - 1;
          self.arena[node].children[bit] = Some(child);
          child
        }
      };
    }
    self.arena[node].payload = Some(payload);
    Ok(())
  }

  /// Walk from the root consuming one bit per edge until a leaf payload
  /// is reached. Fails with `BitsExhausted` if the stream runs dry
  /// mid-walk and with `UnknownCode` if no child exists for the next bit.
  pub fn decode_next(&self, pump: &mut Bitstream<'_>) -> Result<&T> {
    let mut node = 0;
    let mut code: u64 = 0;
    let mut len: usize = 0;
    loop {
      if let Some(payload) = &self.arena[node].payload {
        return Ok(payload);
      }
      let bit = pump.read_bit()?;
      code = (code << 1) | bit as u64;
      len += 1;
      node = match self.arena[node].children[bit as usize] {
        Some(child) => child,
        None => return Err(EntropyError::UnknownCode { code, len }),
      };
    }
  }
}

// SPDX-License-Identifier: LGPL-2.1

use log::debug;
use serde::{Deserialize, Serialize};

use super::{ContainerConfig, ENTRY_SIZE, Entry, Result, TiffError, reader::EndianReader};
use crate::bits::Endian;
use crate::tags::TiffTag;

/// One decoded tag directory.
///
/// Entries keep their on-disk order. A directory is built once while a
/// chain is followed and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IFD {
  /// File offset this directory was read from
  pub offset: u32,
  /// Tag count as declared on disk
  pub entry_count: u16,
  pub entries: Vec<Entry>,
  /// Offset of the next directory in the chain, 0 ends the chain
  pub next_ifd: u32,
  pub endian: Endian,
}

impl IFD {
  /// Decode the directory at `offset`: the 2-byte tag count, `count`
  /// entries at a fixed 12-byte stride, then the 4-byte next-directory
  /// offset sitting right after the entry block.
  pub fn new(buffer: &[u8], offset: u32, endian: Endian, config: &ContainerConfig) -> Result<IFD> {
    let mut reader = EndianReader::new(buffer, endian);
    reader.goto(offset)?;
    let entry_count = reader.read_u16()?;

    let next_ptr_pos = offset
      .checked_add(2 + entry_count as u32 * ENTRY_SIZE)
      .ok_or_else(|| TiffError::Overflow(format!("Directory at {} with {} entries overflows offsets", offset, entry_count)))?;
    reader.goto(next_ptr_pos)?;
    let next_ifd = reader.read_u32()?;
    if next_ifd as usize > buffer.len() {
      return Err(TiffError::InvalidOffset {
        offset: next_ifd,
        len: buffer.len(),
      });
    }

    debug!("IFD at {}: {} entries, next at {}", offset, entry_count, next_ifd);

    let mut entries = Vec::with_capacity(entry_count as usize);
    for i in 0..entry_count as u32 {
      reader.goto(offset + 2 + i * ENTRY_SIZE)?;
      entries.push(Entry::parse(&mut reader, config)?);
    }

    Ok(IFD {
      offset,
      entry_count,
      entries,
      next_ifd,
      endian,
    })
  }

  /// Follow a directory chain from `first_offset` until a zero
  /// next-offset. Used for the root chain and recursively for nested
  /// chains behind sub-directory tags. A next-offset pointing at an
  /// already-visited directory would walk forever, so it fails instead.
  pub fn read_chain(buffer: &[u8], endian: Endian, first_offset: u32, config: &ContainerConfig) -> Result<Vec<IFD>> {
    let mut chain: Vec<IFD> = Vec::new();
    let mut next = first_offset;
    while next != 0 {
      if chain.iter().any(|ifd| ifd.offset == next) {
        return Err(TiffError::ChainLoop { offset: next });
      }
      let ifd = IFD::new(buffer, next, endian, config)?;
      next = ifd.next_ifd;
      chain.push(ifd);
    }
    Ok(chain)
  }

  /// Linear lookup by tag id. Absence is not an error, most directories
  /// carry only a subset of the known tags.
  pub fn get_entry<T: TiffTag>(&self, tag: T) -> Option<&Entry> {
    let id: u16 = tag.into();
    self.entries.iter().find(|entry| entry.tag == id)
  }

  pub fn has_entry<T: TiffTag>(&self, tag: T) -> bool {
    self.get_entry(tag).is_some()
  }
}

// SPDX-License-Identifier: LGPL-2.1

//! Parser for the TIFF-derived tag-directory container format.
//!
//! A container is a header (byte-order marker, version, offset of the first
//! directory) followed by one or more chained directories (IFDs). Each
//! directory is an ordered table of fixed-size tag entries plus a pointer to
//! the next directory in the chain; entries may themselves point at nested
//! directory chains. All reads happen against an immutable in-memory buffer
//! with the detected byte order threaded through explicitly.

use thiserror::Error;

pub mod entry;
pub mod ifd;
pub mod reader;
pub mod value;

pub use entry::Entry;
pub use ifd::IFD;
pub use reader::ContainerReader;
pub use value::{Rational, SRational, Value};

use crate::tags::TiffCommonTag;

/// Required value of the 16-bit version field in the container header.
pub const CONTAINER_VERSION: u16 = 42;

/// Fixed on-disk size of one directory entry.
pub const ENTRY_SIZE: u32 = 12;

/// Tag entry type codes as declared on disk.
pub const TYPE_BYTE: u16 = 1;
pub const TYPE_ASCII: u16 = 2;
pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;
pub const TYPE_RATIONAL: u16 = 5;
pub const TYPE_UNDEFINED: u16 = 7;
pub const TYPE_SRATIONAL: u16 = 10;
pub const TYPE_SUB_IFD: u16 = 13;

/// Error variants for container parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TiffError {
  /// Byte order marker is neither of the two recognized patterns.
  #[error("Unsupported endian marker: 0x{0:04x}")]
  UnsupportedEndian(u16),

  /// Version field differs from [`CONTAINER_VERSION`].
  #[error("Unknown container version: {0}")]
  UnknownVersion(u16),

  /// A first- or next-directory offset points beyond the buffer.
  #[error("Invalid directory offset {offset}, buffer length is {len}")]
  InvalidOffset { offset: u32, len: usize },

  /// A next-directory offset points back into its own chain.
  #[error("Directory chain loops back to offset {offset}")]
  ChainLoop { offset: u32 },

  /// String payload contains non-ASCII bytes.
  #[error("Tag 0x{tag:04x} string payload is not valid ASCII")]
  InvalidAscii { tag: u16 },

  /// Nested-directory chain length differs from the declared tag count.
  #[error("Sub-directory count mismatch for tag 0x{tag:04x}: declared {declared}, found {found}")]
  SubIfdCountMismatch { tag: u16, declared: u32, found: u32 },

  /// Read past the end of the buffer while decoding structures.
  #[error("Overflow error: {0}")]
  Overflow(String),
}

/// Result type for container parsing
pub type Result<T> = std::result::Result<T, TiffError>;

/// Caller-supplied knobs for the tag factory.
///
/// Some formats declare sub-directory pointers with a plain unsigned or raw
/// byte-sequence type; the override lists tell the factory which tag ids to
/// reinterpret as nested directory chains anyway. Byte-sequence overrides
/// are never count-validated because their declared count is a byte total,
/// not a directory count.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
  /// Tags with an unsigned type whose value is a directory chain offset.
  pub long_sub_ifd_tags: Vec<u16>,
  /// Tags with a raw byte-sequence type whose pointer is a directory
  /// chain offset.
  pub undefined_sub_ifd_tags: Vec<u16>,
  /// Compare discovered chain lengths against the declared tag count.
  pub validate_sub_ifd_count: bool,
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      long_sub_ifd_tags: vec![
        TiffCommonTag::SubIFDs.into(),
        TiffCommonTag::ExifIFDPointer.into(),
        TiffCommonTag::GPSInfo.into(),
      ],
      undefined_sub_ifd_tags: vec![TiffCommonTag::MakerNotes.into()],
      validate_sub_ifd_count: false,
    }
  }
}

impl ContainerConfig {
  /// Config with no sub-directory overrides and no count validation.
  pub fn plain() -> Self {
    Self {
      long_sub_ifd_tags: Vec::new(),
      undefined_sub_ifd_tags: Vec::new(),
      validate_sub_ifd_count: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tags::{MakernoteTag, TiffCommonTag};

  /// Little-endian container builder for synthetic test files.
  struct ContainerBuilder {
    bytes: Vec<u8>,
  }

  impl ContainerBuilder {
    /// Header with first-directory offset 8 (right after the header).
    fn new() -> Self {
      let mut bytes = vec![0x49, 0x49];
      bytes.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
      bytes.extend_from_slice(&8_u32.to_le_bytes());
      Self { bytes }
    }

    fn offset(&self) -> u32 {
      self.bytes.len() as u32
    }

    /// Append a directory: entry count, 12-byte entries, next pointer.
    fn dir(&mut self, entries: &[(u16, u16, u32, [u8; 4])], next: u32) -> u32 {
      let offset = self.offset();
      self.bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
      for (tag, typ, count, value) in entries {
        self.bytes.extend_from_slice(&tag.to_le_bytes());
        self.bytes.extend_from_slice(&typ.to_le_bytes());
        self.bytes.extend_from_slice(&count.to_le_bytes());
        self.bytes.extend_from_slice(value);
      }
      self.bytes.extend_from_slice(&next.to_le_bytes());
      offset
    }

    fn data(&mut self, payload: &[u8]) -> u32 {
      let offset = self.offset();
      self.bytes.extend_from_slice(payload);
      offset
    }
  }

  fn short_entry(tag: u16, value: u16) -> (u16, u16, u32, [u8; 4]) {
    let mut field = [0_u8; 4];
    field[..2].copy_from_slice(&value.to_le_bytes());
    (tag, TYPE_SHORT, 1, field)
  }

  #[test]
  fn end_to_end_single_short_tag() -> Result<()> {
    // Header {marker=II, version=42, firstDirOffset=8}, one directory
    // with one scalar 16-bit tag (id=1, value=5), end of chain.
    let mut builder = ContainerBuilder::new();
    builder.dir(&[short_entry(1, 5)], 0);

    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default())?;
    let ifds = reader.decode()?;
    assert_eq!(ifds.len(), 1);
    assert_eq!(ifds[0].entry_count, 1);
    let entry = ifds[0].get_entry(1_u16).expect("tag 1 must be present");
    assert_eq!(entry.value, Value::Long(5));
    assert!(ifds[0].get_entry(2_u16).is_none());
    Ok(())
  }

  #[test]
  fn big_endian_container() -> Result<()> {
    let mut bytes = vec![0x4d, 0x4d];
    bytes.extend_from_slice(&CONTAINER_VERSION.to_be_bytes());
    bytes.extend_from_slice(&8_u32.to_be_bytes());
    bytes.extend_from_slice(&1_u16.to_be_bytes()); // one entry
    bytes.extend_from_slice(&0x0100_u16.to_be_bytes());
    bytes.extend_from_slice(&TYPE_LONG.to_be_bytes());
    bytes.extend_from_slice(&1_u32.to_be_bytes());
    bytes.extend_from_slice(&6000_u32.to_be_bytes());
    bytes.extend_from_slice(&0_u32.to_be_bytes()); // end of chain

    let reader = ContainerReader::new(&bytes, ContainerConfig::default())?;
    let ifds = reader.decode()?;
    assert_eq!(ifds[0].get_entry(TiffCommonTag::ImageWidth).unwrap().value, Value::Long(6000));
    Ok(())
  }

  #[test]
  fn rejects_unknown_marker() {
    let buf = [0x4a, 0xee, 42, 0, 8, 0, 0, 0];
    assert_eq!(
      ContainerReader::new(&buf, ContainerConfig::default()).err(),
      Some(TiffError::UnsupportedEndian(0xee4a))
    );
  }

  #[test]
  fn rejects_unknown_version() {
    let buf = [0x49, 0x49, 43, 0, 8, 0, 0, 0];
    assert_eq!(
      ContainerReader::new(&buf, ContainerConfig::default()).err(),
      Some(TiffError::UnknownVersion(43))
    );
  }

  #[test]
  fn rejects_first_dir_offset_beyond_buffer() {
    let buf = [0x49, 0x49, 42, 0, 0xff, 0, 0, 0];
    assert!(matches!(
      ContainerReader::new(&buf, ContainerConfig::default()).err(),
      Some(TiffError::InvalidOffset { offset: 0xff, .. })
    ));
  }

  #[test]
  fn rejects_next_dir_offset_beyond_buffer() {
    let mut builder = ContainerBuilder::new();
    builder.dir(&[short_entry(1, 5)], 0xffff);
    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default()).unwrap();
    assert!(matches!(reader.decode().err(), Some(TiffError::InvalidOffset { offset: 0xffff, .. })));
  }

  #[test]
  fn cyclic_chain_fails_instead_of_looping() {
    // Zero-entry directory whose next pointer is its own offset.
    let mut builder = ContainerBuilder::new();
    builder.dir(&[], 8);
    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default()).unwrap();
    assert_eq!(reader.decode().err(), Some(TiffError::ChainLoop { offset: 8 }));

    // Second directory pointing back at the first.
    let mut builder = ContainerBuilder::new();
    let second_offset = 8 + (2 + 12 + 4) as u32;
    builder.dir(&[short_entry(1, 10)], second_offset);
    builder.dir(&[short_entry(2, 20)], 8);
    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default()).unwrap();
    assert_eq!(reader.decode().err(), Some(TiffError::ChainLoop { offset: 8 }));
  }

  #[test]
  fn follows_directory_chain() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    // First directory is 2 + 12 + 4 bytes, the second follows directly.
    let second_offset = 8 + (2 + 12 + 4) as u32;
    builder.dir(&[short_entry(1, 10)], second_offset);
    builder.dir(&[short_entry(2, 20)], 0);

    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default())?;
    let ifds = reader.decode()?;
    assert_eq!(ifds.len(), 2);
    assert_eq!(ifds[0].get_entry(1_u16).unwrap().value, Value::Long(10));
    assert_eq!(ifds[1].get_entry(2_u16).unwrap().value, Value::Long(20));
    assert_eq!(ifds[1].next_ifd, 0);
    Ok(())
  }

  #[test]
  fn pointer_based_long_array() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    // Directory block is 2 + 12 + 4 bytes, payload follows at 26.
    let payload_offset = 8 + 18_u32;
    builder.dir(&[(7, TYPE_LONG, 3, payload_offset.to_le_bytes())], 0);
    for v in [11_u32, 22, 33] {
      builder.data(&v.to_le_bytes());
    }

    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default())?;
    let ifds = reader.decode()?;
    let entry = ifds[0].get_entry(7_u16).unwrap();
    assert_eq!(entry.value, Value::LongArray(vec![11, 22, 33]));
    assert_eq!(entry.data_offset, payload_offset);
    Ok(())
  }

  #[test]
  fn ascii_strings() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    let payload_offset = 8 + (2 + 2 * 12 + 4) as u32;
    builder.dir(
      &[
        (1, TYPE_ASCII, 4, *b"Cam\0"),                     // inline
        (2, TYPE_ASCII, 10, payload_offset.to_le_bytes()), // pointer
      ],
      0,
    );
    builder.data(b"Container\0");

    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::default())?.decode()?;
    assert_eq!(ifds[0].get_entry(1_u16).unwrap().value.as_string(), Some("Cam"));
    assert_eq!(ifds[0].get_entry(2_u16).unwrap().value.as_string(), Some("Container"));
    Ok(())
  }

  #[test]
  fn non_ascii_string_fails() {
    let mut builder = ContainerBuilder::new();
    builder.dir(&[(1, TYPE_ASCII, 4, [0xC3, 0xA9, 0x21, 0])], 0);
    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default()).unwrap();
    assert_eq!(reader.decode().err(), Some(TiffError::InvalidAscii { tag: 1 }));
  }

  #[test]
  fn rational_values() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    let payload_offset = 8 + (2 + 2 * 12 + 4) as u32;
    let srational_offset = payload_offset + 8;
    builder.dir(
      &[
        (1, TYPE_RATIONAL, 1, payload_offset.to_le_bytes()),
        (2, TYPE_SRATIONAL, 1, srational_offset.to_le_bytes()),
      ],
      0,
    );
    builder.data(&300_u32.to_le_bytes());
    builder.data(&100_u32.to_le_bytes());
    builder.data(&(-5_i32).to_le_bytes());
    builder.data(&3_i32.to_le_bytes());

    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::default())?.decode()?;
    assert_eq!(ifds[0].get_entry(1_u16).unwrap().value, Value::Rational(Rational::new(300, 100)));
    assert_eq!(ifds[0].get_entry(2_u16).unwrap().value, Value::SRational(SRational::new(-5, 3)));
    Ok(())
  }

  #[test]
  fn unknown_type_is_preserved() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    builder.dir(&[(9, 99, 2, [0xAA, 0xBB, 0, 0])], 0);
    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::default())?.decode()?;
    let entry = ifds[0].get_entry(9_u16).unwrap();
    assert!(matches!(entry.value, Value::Unknown { type_code: 99, count: 2, .. }));
    Ok(())
  }

  #[test]
  fn unknown_type_with_bogus_pointer_does_not_fail() -> Result<()> {
    // Type 11 shifts to a 20-byte payload, so the value field is a
    // pointer; it is garbage but nothing ever dereferences it.
    let mut builder = ContainerBuilder::new();
    builder.dir(&[(9, 11, 5, 0xdeadbeef_u32.to_le_bytes())], 0);
    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::default())?.decode()?;
    assert!(matches!(ifds[0].get_entry(9_u16).unwrap().value, Value::Unknown { type_code: 11, .. }));
    Ok(())
  }

  #[test]
  fn long_tag_as_sub_ifd() -> Result<()> {
    let sub_tag = 0x8769_u16; // on the default unsigned override list
    let mut builder = ContainerBuilder::new();
    let root_size = 2 + 12 + 4;
    let sub_offset = 8 + root_size as u32;
    builder.dir(&[(sub_tag, TYPE_LONG, 1, sub_offset.to_le_bytes())], 0);
    builder.dir(&[short_entry(0x0100, 4000)], 0);

    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::default())?.decode()?;
    let subs = ifds[0].get_entry(sub_tag).unwrap().value.sub_ifds().expect("must decode as sub-IFDs");
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].get_entry(0x0100_u16).unwrap().value, Value::Long(4000));
    Ok(())
  }

  #[test]
  fn sub_ifd_count_validation() {
    let sub_tag = 0x8769_u16;
    let mut builder = ContainerBuilder::new();
    // Count 2 makes the payload an 8-byte offset array behind a pointer;
    // only the first offset starts the chain, which holds one directory.
    let array_offset = 8 + (2 + 12 + 4) as u32;
    let sub_offset = array_offset + 8;
    builder.dir(&[(sub_tag, TYPE_LONG, 2, array_offset.to_le_bytes())], 0);
    builder.data(&sub_offset.to_le_bytes());
    builder.data(&0_u32.to_le_bytes());
    builder.dir(&[short_entry(1, 1)], 0);

    let mut config = ContainerConfig::default();
    config.validate_sub_ifd_count = true;
    let reader = ContainerReader::new(&builder.bytes, config).unwrap();
    assert_eq!(
      reader.decode().err(),
      Some(TiffError::SubIfdCountMismatch {
        tag: sub_tag,
        declared: 2,
        found: 1
      })
    );

    // Disabled validation accepts the same container.
    let reader = ContainerReader::new(&builder.bytes, ContainerConfig::default()).unwrap();
    assert!(reader.decode().is_ok());
  }

  #[test]
  fn undefined_tag_as_sub_ifd_skips_count_validation() -> Result<()> {
    let sub_tag = 0x927c_u16; // maker notes, byte-sequence override
    let mut builder = ContainerBuilder::new();
    let sub_offset = 8 + (2 + 12 + 4) as u32;
    // Count is a byte total (here 18, the nested directory size), not a
    // directory count; validation must not trip on it.
    builder.dir(&[(sub_tag, TYPE_UNDEFINED, 18, sub_offset.to_le_bytes())], 0);
    builder.dir(&[short_entry(0x4001, 77)], 0);

    let mut config = ContainerConfig::default();
    config.validate_sub_ifd_count = true;
    let ifds = ContainerReader::new(&builder.bytes, config)?.decode()?;
    let subs = ifds[0].get_entry(sub_tag).unwrap().value.sub_ifds().unwrap();
    assert_eq!(subs[0].get_entry(MakernoteTag::ColorData).unwrap().value, Value::Long(77));
    Ok(())
  }

  #[test]
  fn undefined_tag_without_override_keeps_bytes() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    builder.dir(&[(5, TYPE_UNDEFINED, 3, [1, 2, 3, 0])], 0);
    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::plain())?.decode()?;
    assert_eq!(ifds[0].get_entry(5_u16).unwrap().value, Value::Undefined(vec![1, 2, 3]));
    Ok(())
  }

  #[test]
  fn explicit_sub_ifd_type() -> Result<()> {
    let mut builder = ContainerBuilder::new();
    let sub_offset = 8 + (2 + 12 + 4) as u32;
    builder.dir(&[(40, TYPE_SUB_IFD, 1, sub_offset.to_le_bytes())], 0);
    builder.dir(&[short_entry(41, 9)], 0);

    // No override lists needed, the type code alone selects recursion.
    let ifds = ContainerReader::new(&builder.bytes, ContainerConfig::plain())?.decode()?;
    let subs = ifds[0].get_entry(40_u16).unwrap().value.sub_ifds().unwrap();
    assert_eq!(subs[0].get_entry(41_u16).unwrap().value, Value::Long(9));
    Ok(())
  }
}

// SPDX-License-Identifier: LGPL-2.1

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
  ContainerConfig, IFD, Rational, Result, SRational, TiffError, Value,
  TYPE_ASCII, TYPE_BYTE, TYPE_LONG, TYPE_RATIONAL, TYPE_SHORT, TYPE_SRATIONAL, TYPE_SUB_IFD, TYPE_UNDEFINED,
  reader::EndianReader,
};

// Byte-size shift per declared type code (0-13).
const DATASHIFTS: [u8; 14] = [0, 0, 0, 1, 2, 3, 0, 0, 1, 2, 3, 2, 3, 2];

/// One directory entry: identifier plus decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub tag: u16,
  pub value: Value,
  /// Buffer offset of the payload: the inline value field for payloads
  /// of 4 bytes or less, the pointed-to location otherwise.
  pub data_offset: u32,
}

impl Entry {
  /// Tag factory. The cursor must sit at the start of a 12-byte entry:
  /// 2-byte id, 2-byte type code, 4-byte element count, 4-byte
  /// value-or-pointer field. Dispatch follows the declared type, the
  /// element count and the caller's sub-directory override lists.
  pub fn parse(reader: &mut EndianReader<'_>, config: &ContainerConfig) -> Result<Entry> {
    let tag = reader.read_u16()?;
    let typ = reader.read_u16()?;
    let count = reader.read_u32()?;

    // Unknown type codes get a byte-sized slot so the pointer logic
    // stays consistent.
    let compat_typ = if typ == 0 || typ as usize >= DATASHIFTS.len() { TYPE_UNDEFINED } else { typ };
    let bytesize: usize = (count as usize) << DATASHIFTS[compat_typ as usize];
    let data_offset: u32 = if bytesize <= 4 { reader.position() } else { reader.read_u32()? };

    debug!("Tag: {:#x}, type: {}, count: {}, data at {}", tag, typ, count, data_offset);

    // Unrecognized type codes never fail, so only seek to the payload
    // once the type is known to be decoded.
    if matches!(
      typ,
      TYPE_BYTE | TYPE_ASCII | TYPE_SHORT | TYPE_LONG | TYPE_RATIONAL | TYPE_UNDEFINED | TYPE_SRATIONAL | TYPE_SUB_IFD
    ) {
      reader.goto(data_offset)?;
    }
    let value = match typ {
      TYPE_BYTE | TYPE_SHORT | TYPE_LONG => {
        if config.long_sub_ifd_tags.contains(&tag) {
          let first_offset = read_unsigned(reader, typ)?;
          Self::parse_sub_ifds(reader, tag, count, first_offset, config, config.validate_sub_ifd_count)?
        } else {
          let mut v = Vec::with_capacity(count as usize);
          for _ in 0..count {
            v.push(read_unsigned(reader, typ)?);
          }
          if count == 1 { Value::Long(v[0]) } else { Value::LongArray(v) }
        }
      }
      TYPE_ASCII => {
        let raw = reader.read_bytes(count as usize)?;
        let stripped = &raw[..raw.iter().position(|&b| b == b'\0').unwrap_or(raw.len())];
        if !stripped.is_ascii() {
          return Err(TiffError::InvalidAscii { tag });
        }
        Value::Ascii(String::from_utf8_lossy(stripped).into_owned())
      }
      TYPE_RATIONAL => {
        let mut v = Vec::with_capacity(count as usize);
        for _ in 0..count {
          let n = reader.read_u32()?;
          let d = reader.read_u32()?;
          v.push(Rational::new(n, d));
        }
        if count == 1 { Value::Rational(v[0]) } else { Value::RationalArray(v) }
      }
      TYPE_SRATIONAL => {
        let mut v = Vec::with_capacity(count as usize);
        for _ in 0..count {
          let n = reader.read_i32()?;
          let d = reader.read_i32()?;
          v.push(SRational::new(n, d));
        }
        if count == 1 { Value::SRational(v[0]) } else { Value::SRationalArray(v) }
      }
      TYPE_UNDEFINED => {
        if config.undefined_sub_ifd_tags.contains(&tag) {
          // The declared count is a byte total here, never validated
          // against the chain length.
          Self::parse_sub_ifds(reader, tag, count, data_offset, config, false)?
        } else {
          Value::Undefined(reader.read_bytes(count as usize)?.to_vec())
        }
      }
      TYPE_SUB_IFD => {
        let first_offset = reader.read_u32()?;
        Self::parse_sub_ifds(reader, tag, count, first_offset, config, config.validate_sub_ifd_count)?
      }
      _ => Value::Unknown {
        type_code: typ,
        count,
        offset: data_offset,
      },
    };

    Ok(Entry { tag, value, data_offset })
  }

  /// Nested chains reuse the top-level chain-following algorithm with the
  /// entry's pointer as the first directory offset.
  fn parse_sub_ifds(
    reader: &mut EndianReader<'_>,
    tag: u16,
    declared_count: u32,
    first_offset: u32,
    config: &ContainerConfig,
    validate_count: bool,
  ) -> Result<Value> {
    let chain = IFD::read_chain(reader.buffer(), reader.endian(), first_offset, config)?;
    if validate_count && chain.len() as u32 != declared_count {
      return Err(TiffError::SubIfdCountMismatch {
        tag,
        declared: declared_count,
        found: chain.len() as u32,
      });
    }
    Ok(Value::SubIfds(chain))
  }

  pub fn count(&self) -> usize {
    self.value.count()
  }
}

fn read_unsigned(reader: &mut EndianReader<'_>, typ: u16) -> Result<u32> {
  match typ {
    TYPE_BYTE => Ok(reader.read_u8()? as u32),
    TYPE_SHORT => Ok(reader.read_u16()? as u32),
    _ => reader.read_u32(),
  }
}

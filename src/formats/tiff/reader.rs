// SPDX-License-Identifier: LGPL-2.1

use log::debug;

use super::{ContainerConfig, IFD, Result, TiffError};
use crate::bits::Endian;

use super::CONTAINER_VERSION;

/// Bounds-checked cursor over the container buffer.
///
/// Every structural read goes through this type so the detected byte order
/// and the backing buffer travel together; directories never keep a
/// back-reference to their file.
pub struct EndianReader<'a> {
  buffer: &'a [u8],
  pos: usize,
  endian: Endian,
}

impl<'a> EndianReader<'a> {
  pub fn new(buffer: &'a [u8], endian: Endian) -> Self {
    Self { buffer, pos: 0, endian }
  }

  pub fn buffer(&self) -> &'a [u8] {
    self.buffer
  }

  pub fn endian(&self) -> Endian {
    self.endian
  }

  pub fn position(&self) -> u32 {
    self.pos as u32
  }

  pub fn goto(&mut self, offset: u32) -> Result<()> {
    if offset as usize > self.buffer.len() {
      return Err(TiffError::Overflow(format!("Seek to {} is beyond buffer end {}", offset, self.buffer.len())));
    }
    self.pos = offset as usize;
    Ok(())
  }

  fn ensure(&self, n: usize) -> Result<()> {
    if self.pos + n > self.buffer.len() {
      return Err(TiffError::Overflow(format!(
        "Read of {} bytes at {} is beyond buffer end {}",
        n,
        self.pos,
        self.buffer.len()
      )));
    }
    Ok(())
  }

  pub fn read_u8(&mut self) -> Result<u8> {
    self.ensure(1)?;
    let val = self.buffer[self.pos];
    self.pos += 1;
    Ok(val)
  }

  pub fn read_u16(&mut self) -> Result<u16> {
    self.ensure(2)?;
    let val = self.endian.read_u16(self.buffer, self.pos);
    self.pos += 2;
    Ok(val)
  }

  pub fn read_u32(&mut self) -> Result<u32> {
    self.ensure(4)?;
    let val = self.endian.read_u32(self.buffer, self.pos);
    self.pos += 4;
    Ok(val)
  }

  pub fn read_i32(&mut self) -> Result<i32> {
    self.ensure(4)?;
    let val = self.endian.read_i32(self.buffer, self.pos);
    self.pos += 4;
    Ok(val)
  }

  pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
    self.ensure(n)?;
    let val = &self.buffer[self.pos..self.pos + n];
    self.pos += n;
    Ok(val)
  }
}

/// Top-level reader for a container buffer.
///
/// Validates the fixed-size header on construction; [`decode`] then follows
/// the root directory chain.
///
/// [`decode`]: ContainerReader::decode
pub struct ContainerReader<'a> {
  buffer: &'a [u8],
  endian: Endian,
  first_ifd: u32,
  config: ContainerConfig,
}

impl<'a> ContainerReader<'a> {
  /// Header layout: 2-byte order marker, 2-byte version, 4-byte offset of
  /// the first directory. The marker bytes decide how every later
  /// multi-byte field is read.
  pub fn new(buffer: &'a [u8], config: ContainerConfig) -> Result<Self> {
    let mut header = EndianReader::new(buffer, Endian::Little);
    let endian = match header.read_u16()? {
      0x4949 => Endian::Little,
      0x4d4d => Endian::Big,
      x => {
        return Err(TiffError::UnsupportedEndian(x));
      }
    };
    let mut header = EndianReader::new(buffer, endian);
    header.goto(2)?;
    let version = header.read_u16()?;
    if version != CONTAINER_VERSION {
      return Err(TiffError::UnknownVersion(version));
    }
    let first_ifd = header.read_u32()?;
    if first_ifd as usize > buffer.len() {
      return Err(TiffError::InvalidOffset {
        offset: first_ifd,
        len: buffer.len(),
      });
    }
    debug!("Container header: endian {:?}, first IFD at {}", endian, first_ifd);
    Ok(Self {
      buffer,
      endian,
      first_ifd,
      config,
    })
  }

  pub fn endian(&self) -> Endian {
    self.endian
  }

  pub fn first_ifd_offset(&self) -> u32 {
    self.first_ifd
  }

  /// Follow the root directory chain from the first-directory offset. A
  /// next-offset of 0 ends the chain; the first failure inside any
  /// directory aborts the whole decode.
  pub fn decode(&self) -> Result<Vec<IFD>> {
    IFD::read_chain(self.buffer, self.endian, self.first_ifd, &self.config)
  }
}

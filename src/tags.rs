// SPDX-License-Identifier: LGPL-2.1

//! Well-known tag identifiers.
//!
//! Directories address entries by bare `u16` identifiers; these enums only
//! give names to the ones this crate and its callers care about. Lookup by
//! any unlisted id still works through the raw value.

/// Marker trait for typed tag id enums usable in directory lookups.
pub trait TiffTag: Into<u16> + Copy {}

impl TiffTag for u16 {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, enumn::N)]
#[repr(u16)]
pub enum TiffCommonTag {
  ImageWidth = 0x0100,
  ImageLength = 0x0101,
  BitsPerSample = 0x0102,
  Compression = 0x0103,
  Make = 0x010f,
  Model = 0x0110,
  StripOffsets = 0x0111,
  StripByteCounts = 0x0117,
  SubIFDs = 0x014a,
  ExifIFDPointer = 0x8769,
  GPSInfo = 0x8825,
  MakerNotes = 0x927c,
  RawId = 0xc5d8,
  SliceInfo = 0xc640,
}

impl From<TiffCommonTag> for u16 {
  fn from(tag: TiffCommonTag) -> u16 {
    tag as u16
  }
}

impl TryFrom<u16> for TiffCommonTag {
  type Error = String;

  fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
    Self::n(value).ok_or(format!("Unable to convert tag: {}, not defined in enum", value))
  }
}

impl TiffTag for TiffCommonTag {}

/// Maker note tags live in their own id namespace below the MakerNotes
/// sub-directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, enumn::N)]
#[repr(u16)]
pub enum MakernoteTag {
  SensorInfo = 0x00e0,
  ColorData = 0x4001,
}

impl From<MakernoteTag> for u16 {
  fn from(tag: MakernoteTag) -> u16 {
    tag as u16
  }
}

impl TryFrom<u16> for MakernoteTag {
  type Error = String;

  fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
    Self::n(value).ok_or(format!("Unable to convert tag: {}, not defined in enum", value))
  }
}

impl TiffTag for MakernoteTag {}

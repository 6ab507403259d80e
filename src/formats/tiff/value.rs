// SPDX-License-Identifier: LGPL-2.1

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ifd::IFD;

/// Fraction stored as two 32-bit unsigned integers
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy)]
pub struct Rational {
  pub n: u32,
  pub d: u32,
}

impl Rational {
  pub fn new(n: u32, d: u32) -> Self {
    Self { n, d }
  }
}

impl Display for Rational {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{}/{}", self.n, self.d))
  }
}

impl From<Rational> for f32 {
  fn from(v: Rational) -> Self {
    (v.n as f32) / (v.d as f32)
  }
}

impl Serialize for Rational {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&format!("{}/{}", self.n, self.d))
  }
}

impl<'de> Deserialize<'de> for Rational {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Rational, D::Error>
  where
    D: Deserializer<'de>,
  {
    use serde::de::Error;
    let s = String::deserialize(deserializer)?;
    let values: Vec<&str> = s.split('/').collect();
    if values.len() != 2 {
      Err(D::Error::custom(format!("Invalid rational value: {}", s)))
    } else {
      Ok(Rational::new(
        values[0].parse::<u32>().map_err(D::Error::custom)?,
        values[1].parse::<u32>().map_err(D::Error::custom)?,
      ))
    }
  }
}

/// Fraction stored as two 32-bit signed integers
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy)]
pub struct SRational {
  pub n: i32,
  pub d: i32,
}

impl SRational {
  pub fn new(n: i32, d: i32) -> Self {
    Self { n, d }
  }
}

impl Display for SRational {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{}/{}", self.n, self.d))
  }
}

impl From<SRational> for f32 {
  fn from(v: SRational) -> Self {
    (v.n as f32) / (v.d as f32)
  }
}

impl Serialize for SRational {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&format!("{}/{}", self.n, self.d))
  }
}

impl<'de> Deserialize<'de> for SRational {
  fn deserialize<D>(deserializer: D) -> std::result::Result<SRational, D::Error>
  where
    D: Deserializer<'de>,
  {
    use serde::de::Error;
    let s = String::deserialize(deserializer)?;
    let values: Vec<&str> = s.split('/').collect();
    if values.len() != 2 {
      Err(D::Error::custom(format!("Invalid srational value: {}", s)))
    } else {
      Ok(SRational::new(
        values[0].parse::<i32>().map_err(D::Error::custom)?,
        values[1].parse::<i32>().map_err(D::Error::custom)?,
      ))
    }
  }
}

/// Decoded payload of one directory entry.
///
/// This is a closed set selected by the tag factory: unsigned scalars are
/// upcast to 32 bits, sub-directory overrides become full decoded chains
/// and unhandled type codes are preserved untouched as [`Value::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
  /// Scalar unsigned integer, upcast from 8/16/32-bit storage
  Long(u32),
  /// Array of upcast unsigned integers
  LongArray(Vec<u32>),
  /// NUL-stripped ASCII string
  Ascii(String),
  /// Scalar unsigned fraction
  Rational(Rational),
  /// Array of unsigned fractions
  RationalArray(Vec<Rational>),
  /// Scalar signed fraction
  SRational(SRational),
  /// Array of signed fractions
  SRationalArray(Vec<SRational>),
  /// Raw byte sequence
  Undefined(Vec<u8>),
  /// Nested directory chain
  SubIfds(Vec<IFD>),
  /// Unrecognized type code, nothing decoded
  Unknown { type_code: u16, count: u32, offset: u32 },
}

impl Value {
  /// Number of decoded elements.
  pub fn count(&self) -> usize {
    match self {
      Self::Long(_) | Self::Rational(_) | Self::SRational(_) => 1,
      Self::LongArray(v) => v.len(),
      Self::Ascii(s) => s.len(),
      Self::RationalArray(v) => v.len(),
      Self::SRationalArray(v) => v.len(),
      Self::Undefined(v) => v.len(),
      Self::SubIfds(v) => v.len(),
      Self::Unknown { count, .. } => *count as usize,
    }
  }

  pub fn as_string(&self) -> Option<&str> {
    match self {
      Self::Ascii(s) => Some(s),
      _ => None,
    }
  }

  pub fn sub_ifds(&self) -> Option<&[IFD]> {
    match self {
      Self::SubIfds(v) => Some(v),
      _ => None,
    }
  }

  pub fn get_u32(&self, idx: usize) -> Option<u32> {
    match self {
      Self::Long(v) => (idx == 0).then_some(*v),
      Self::LongArray(v) => v.get(idx).copied(),
      Self::Undefined(v) => v.get(idx).map(|v| *v as u32),
      _ => None,
    }
  }

  /// Unsigned value at `idx`, 0 when absent or non-integer. Convenience
  /// for geometry tags where a missing value means "not sliced" etc.
  pub fn force_u32(&self, idx: usize) -> u32 {
    self.get_u32(idx).unwrap_or(0)
  }

  pub fn force_usize(&self, idx: usize) -> usize {
    self.force_u32(idx) as usize
  }

  pub fn force_u16(&self, idx: usize) -> u16 {
    self.force_u32(idx) as u16
  }
}

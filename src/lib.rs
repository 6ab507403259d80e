// SPDX-License-Identifier: LGPL-2.1

//! Library to extract raw sensor data and metadata from TIFF-derived
//! camera container files.
//!
//! The container is parsed as a chain of tag directories
//! ([`formats::tiff::ContainerReader`]), the entropy-coded pixel payload
//! is reconstructed through a bitstream and a generic Huffman tree
//! ([`pumps::Bitstream`], [`huffman::HuffmanTree`],
//! [`decompressors::LosslessDecompressor`]) and the resulting sample
//! sequence is assembled into a corrected sensor plane ([`sensor`]).
//!
//! # Example
//! ```rust
//! use rawcore::formats::tiff::{ContainerConfig, ContainerReader};
//!
//! // Minimal little-endian container: header plus one empty directory.
//! let buf: &[u8] = &[
//!   0x49, 0x49, 42, 0, 8, 0, 0, 0, // header, first IFD at 8
//!   0, 0, // no entries
//!   0, 0, 0, 0, // end of chain
//! ];
//! let reader = ContainerReader::new(buf, ContainerConfig::default()).unwrap();
//! let ifds = reader.decode().unwrap();
//! assert_eq!(ifds.len(), 1);
//! ```
//!
//! Everything runs synchronously over in-memory buffers; the first failure
//! anywhere aborts the whole decode and surfaces as [`RawcoreError`].
//! Demosaicing, color conversion and lossy JPEG are out of scope and left
//! to downstream consumers of [`sensor::SensorImage`].

use thiserror::Error;

pub mod bits;
pub mod decompressors;
pub mod formats;
pub mod huffman;
pub mod pumps;
pub mod sensor;
pub mod tags;

pub use huffman::HuffmanTree;
pub use pumps::Bitstream;
pub use sensor::SensorImage;

use formats::tiff::TiffError;
use pumps::EntropyError;
use sensor::ReconstructError;

#[derive(Debug, Error)]
pub enum RawcoreError {
  #[error("Container error: {0}")]
  Tiff(#[from] TiffError),

  #[error("Entropy decoder error: {0}")]
  Entropy(#[from] EntropyError),

  #[error("Reconstruction error: {0}")]
  Reconstruct(#[from] ReconstructError),

  #[error("{0}")]
  General(String),
}

pub type Result<T> = std::result::Result<T, RawcoreError>;

impl From<String> for RawcoreError {
  fn from(str: String) -> Self {
    Self::General(str)
  }
}

impl From<&String> for RawcoreError {
  fn from(str: &String) -> Self {
    Self::General(str.clone())
  }
}

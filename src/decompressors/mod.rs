// SPDX-License-Identifier: LGPL-2.1

pub mod lossless;

pub use lossless::{LosslessDecompressor, decode_diff};

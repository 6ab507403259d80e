// SPDX-License-Identifier: LGPL-2.1

//! Sensor geometry reconstruction.
//!
//! The entropy decoder delivers one long interleaved sample sequence,
//! slice by slice. This module scatters the slices back into a rectangular
//! row-major plane, detects the vertical phase of the color filter array,
//! estimates per-channel black levels from the optically-black border and
//! trims the plane down to its visible rectangle. The resulting
//! [`SensorImage`] is handed off by value to the external demosaic stage.

use thiserror::Error;

/// Error variants for plane reconstruction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconstructError {
  /// Decoder output ran out before every destination cell was filled.
  #[error("Short read while unslicing: need {expected} samples, got {got}")]
  ShortRead { expected: usize, got: usize },

  /// Slice columns don't fit the plane width.
  #[error("Invalid slice geometry: {count} slices of width {width} for a plane of width {total}")]
  InvalidSliceGeometry { count: usize, width: usize, total: usize },

  /// Border rectangle is inverted or extends past the plane.
  #[error("Invalid borders: rows {top}..{bottom}, cols {left}..{right} on a {width}x{height} plane")]
  InvalidBorders {
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
    width: usize,
    height: usize,
  },
}

pub type Result<T> = std::result::Result<T, ReconstructError>;

/// Vertical slice layout of the compressed sensor image: `count` slices,
/// the first `count - 1` of them `width` samples wide, the last covering
/// the remainder of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceGeometry {
  pub count: usize,
  pub width: usize,
}

impl SliceGeometry {
  pub fn new(count: usize, width: usize) -> Self {
    Self { count, width }
  }

  /// Column widths of all slices for a plane `total` samples wide.
  fn widths(&self, total: usize) -> Result<Vec<usize>> {
    if self.count == 0 {
      return Ok(vec![total]);
    }
    let full = (self.count - 1) * self.width;
    if full >= total {
      return Err(ReconstructError::InvalidSliceGeometry {
        count: self.count,
        width: self.width,
        total,
      });
    }
    let mut widths = vec![self.width; self.count - 1];
    widths.push(total - full);
    Ok(widths)
  }
}

/// Rectangle bounding the visible sensor area, rows `top..bottom` and
/// columns `left..right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Borders {
  pub top: usize,
  pub bottom: usize,
  pub left: usize,
  pub right: usize,
}

impl Borders {
  pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Self {
    Self { top, bottom, left, right }
  }

  /// Borders come from file tags and can't be trusted; every consumer
  /// checks the rectangle against the plane before indexing.
  fn check(&self, width: usize, height: usize) -> Result<()> {
    if self.top > self.bottom || self.left > self.right || self.bottom > height || self.right > width {
      return Err(ReconstructError::InvalidBorders {
        top: self.top,
        bottom: self.bottom,
        left: self.left,
        right: self.right,
        width,
        height,
      });
    }
    Ok(())
  }
}

/// Decoded raw plane plus the calibration scalars the demosaic stage
/// needs. Ownership moves out of the decoder wholesale; nothing here is
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct SensorImage {
  /// Row stride in samples
  pub width: usize,
  pub height: usize,
  /// Components per pixel
  pub cpp: usize,
  /// Per-channel white balance multipliers
  pub wb_coeffs: [f32; 4],
  /// Per-Bayer-channel black levels
  pub blacklevels: [u16; 4],
  /// Vertical CFA phase, 0 or 1 rows
  pub cfa_shift: usize,
  pub slices: SliceGeometry,
  /// Interleaved samples, `width * height` of them
  pub data: Vec<u16>,
}

impl SensorImage {
  /// Assemble the decoder's per-slice sample sequence into a finished
  /// plane: unslice, then derive CFA phase and black levels from the
  /// optically-black `black_region`.
  pub fn reconstruct(
    samples: &[u16],
    width: usize,
    height: usize,
    cpp: usize,
    wb_coeffs: [f32; 4],
    slices: SliceGeometry,
    black_region: Borders,
  ) -> Result<SensorImage> {
    let data = unslice(samples, width, height, &slices)?;
    let cfa_shift = detect_cfa_shift(&data, width, black_region)?;
    let blacklevels = estimate_black_levels(&data, width, black_region)?;
    Ok(SensorImage {
      width,
      height,
      cpp,
      wb_coeffs,
      blacklevels,
      cfa_shift,
      slices,
      data,
    })
  }
}

/// Scatter the slice-major sample sequence into a row-major plane.
///
/// Each slice decodes to a contiguous run covering its column range over
/// all rows. Fails if `samples` is exhausted before every destination
/// cell of every slice is filled; remaining cells are never defaulted.
pub fn unslice(samples: &[u16], width: usize, height: usize, slices: &SliceGeometry) -> Result<Vec<u16>> {
  let expected = width * height;
  if samples.len() < expected {
    return Err(ReconstructError::ShortRead {
      expected,
      got: samples.len(),
    });
  }

  let widths = slices.widths(width)?;
  let mut out = vec![0_u16; expected];
  let mut input = samples.iter();
  let mut slice_start = 0;
  for slice_width in widths {
    for row in 0..height {
      let outpos = row * width + slice_start;
      for cell in &mut out[outpos..outpos + slice_width] {
        match input.next() {
          Some(sample) => *cell = *sample,
          None => {
            return Err(ReconstructError::ShortRead {
              expected,
              got: samples.len(),
            });
          }
        }
      }
    }
    slice_start += slice_width;
  }
  Ok(out)
}

/// Guess whether the CFA pattern is shifted down by one row.
///
/// Sums the sampling region bucketed by (row parity, column parity).
/// When the two green buckets differ less than red and blue do, the
/// visible origin is treated as one row into the pattern. This is a
/// statistical guess with no confidence bound, not a guarantee.
pub fn detect_cfa_shift(plane: &[u16], width: usize, region: Borders) -> Result<usize> {
  region.check(width, plane_rows(plane, width))?;
  let mut sums = [[0_u64; 2]; 2];
  for row in region.top..region.bottom {
    for col in region.left..region.right {
      sums[row & 1][col & 1] += plane[row * width + col] as u64;
    }
  }
  let green_diff = sums[0][1].abs_diff(sums[1][0]);
  let rb_diff = sums[0][0].abs_diff(sums[1][1]);
  Ok(if green_diff < rb_diff { 1 } else { 0 })
}

/// Average the optically-black border region into one black level per
/// Bayer channel, bucketed by (row parity, column parity). The first two
/// columns of the region are skipped, they carry more noise.
pub fn estimate_black_levels(plane: &[u16], width: usize, region: Borders) -> Result<[u16; 4]> {
  region.check(width, plane_rows(plane, width))?;
  let mut sums = [[0_u64; 2]; 2];
  let mut counts = [[0_u64; 2]; 2];
  for row in region.top..region.bottom {
    for col in (region.left + 2)..region.right {
      sums[row & 1][col & 1] += plane[row * width + col] as u64;
      counts[row & 1][col & 1] += 1;
    }
  }
  let mut levels = [0_u16; 4];
  for row in 0..2 {
    for col in 0..2 {
      if counts[row][col] > 0 {
        levels[row * 2 + col] = (sums[row][col] / counts[row][col]) as u16;
      }
    }
  }
  Ok(levels)
}

/// Compact the visible rectangle to the front of the plane, row by row,
/// and return the resulting byte length.
pub fn trim_borders(plane: &mut [u16], width: usize, borders: Borders) -> Result<usize> {
  borders.check(width, plane_rows(plane, width))?;
  let visible_cols = borders.right - borders.left;
  let visible_rows = borders.bottom - borders.top;
  for row in 0..visible_rows {
    let src = (borders.top + row) * width + borders.left;
    let dst = row * visible_cols;
    plane.copy_within(src..src + visible_cols, dst);
  }
  Ok(visible_rows * visible_cols * std::mem::size_of::<u16>())
}

fn plane_rows(plane: &[u16], width: usize) -> usize {
  if width == 0 { 0 } else { plane.len() / width }
}

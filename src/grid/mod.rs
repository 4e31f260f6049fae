// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rectangular image grids of flux values, and down-sampling between the
//! super-resolution and observed-resolution versions of a band's field of
//! view.


use itertools::Itertools;
use ndarray::Array2;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::math::flux_to_mag;

lazy_static::lazy_static! {
    pub(crate) static ref REBIN_POLICIES: String = RebinPolicy::iter().join(", ");
}

/// How a super-resolution grid is down-sampled to observed resolution. Both
/// policies map super-resolution pixel `i` to observed pixel
/// `floor(i * dy_super / dy_obs)` per axis; they differ in what each observed
/// pixel receives.
///
/// The two policies are deliberately not reconciled; both appear in the wild,
/// and they give materially different observed frames. `Integrate` conserves
/// flux and must only ever be applied to linear-flux grids; `Mean` is the
/// right choice once a grid holds magnitudes.
#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq)]
pub enum RebinPolicy {
    /// Each observed pixel is the sum of the super-resolution pixels falling
    /// inside its footprint.
    #[strum(serialize = "integrate")]
    Integrate,

    /// Each observed pixel is the mean of the super-resolution pixels falling
    /// inside its footprint (sum divided by hit count).
    #[strum(serialize = "mean")]
    Mean,
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Cannot convert pixel {index} to a magnitude; its accumulated flux is {value} (not positive)")]
    NonPositiveFlux { index: usize, value: f64 },
}

/// A rectangular array of flux values with physical dimensions. Rows run top
/// to bottom (y decreasing with row index i), columns left to right (x
/// increasing with column index j); the flat index of pixel (i, j) is
/// `i * nj + j`.
#[derive(Clone, Debug)]
pub struct ImageGrid {
    /// Physical width \[arcsec\].
    width: f64,

    /// Physical height \[arcsec\].
    height: f64,

    /// Pixel values, (row, column) = (i, j).
    data: Array2<f64>,
}

impl ImageGrid {
    /// A zero-initialised grid of `ni` rows by `nj` columns.
    pub fn new(ni: usize, nj: usize, width: f64, height: f64) -> ImageGrid {
        ImageGrid {
            width,
            height,
            data: Array2::zeros((ni, nj)),
        }
    }

    pub fn from_data(data: Array2<f64>, width: f64, height: f64) -> ImageGrid {
        ImageGrid {
            width,
            height,
            data,
        }
    }

    pub fn ni(&self) -> usize {
        self.data.nrows()
    }

    pub fn nj(&self) -> usize {
        self.data.ncols()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Pixel width \[arcsec/pixel\].
    pub fn dx(&self) -> f64 {
        self.width / self.nj() as f64
    }

    /// Pixel height \[arcsec/pixel\].
    pub fn dy(&self) -> f64 {
        self.height / self.ni() as f64
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// The pixel values as a flat row-major slice. Grids are always in
    /// standard layout, so this cannot fail.
    pub(crate) fn as_flat(&self) -> &[f64] {
        self.data.as_slice().unwrap()
    }

    pub(crate) fn as_flat_mut(&mut self) -> &mut [f64] {
        self.data.as_slice_mut().unwrap()
    }

    pub(crate) fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Add another grid of identical dimensions, pixel by pixel.
    pub(crate) fn add_assign(&mut self, other: &ImageGrid) {
        debug_assert_eq!(self.data.dim(), other.data.dim());
        self.data += &other.data;
    }

    /// Convert every pixel from linear flux to a magnitude, in place. Any
    /// non-positive pixel makes the conversion fail; the result would be
    /// undefined in log space and must never be silently clamped.
    pub(crate) fn to_magnitudes(&mut self) -> Result<(), GridError> {
        for (index, pixel) in self.as_flat_mut().iter_mut().enumerate() {
            if *pixel <= 0.0 {
                return Err(GridError::NonPositiveFlux {
                    index,
                    value: *pixel,
                });
            }
            *pixel = flux_to_mag(*pixel);
        }
        Ok(())
    }

    /// Down-sample into `out`, *adding* to its existing contents. `out` must
    /// cover the same physical extent with coarser pixels. Exactly one policy
    /// must ever be applied in the derivation of a frame; mixing them within
    /// one frame is a correctness bug.
    pub(crate) fn rebin_into(&self, out: &mut ImageGrid, policy: RebinPolicy) {
        let dy_ratio = self.dy() / out.dy();
        let dx_ratio = self.dx() / out.dx();
        let (out_ni, out_nj) = (out.ni(), out.nj());

        match policy {
            RebinPolicy::Integrate => {
                for (i, row) in self.data.rows().into_iter().enumerate() {
                    let ii = ((i as f64 * dy_ratio) as usize).min(out_ni - 1);
                    for (j, &value) in row.iter().enumerate() {
                        let jj = ((j as f64 * dx_ratio) as usize).min(out_nj - 1);
                        out.data[(ii, jj)] += value;
                    }
                }
            }

            RebinPolicy::Mean => {
                let mut sums = Array2::<f64>::zeros((out_ni, out_nj));
                let mut counts = Array2::<u32>::zeros((out_ni, out_nj));
                for (i, row) in self.data.rows().into_iter().enumerate() {
                    let ii = ((i as f64 * dy_ratio) as usize).min(out_ni - 1);
                    for (j, &value) in row.iter().enumerate() {
                        let jj = ((j as f64 * dx_ratio) as usize).min(out_nj - 1);
                        sums[(ii, jj)] += value;
                        counts[(ii, jj)] += 1;
                    }
                }
                for ((out, &sum), &count) in out.data.iter_mut().zip(sums.iter()).zip(counts.iter())
                {
                    if count > 0 {
                        *out += sum / f64::from(count);
                    }
                }
            }
        }
    }

    /// Down-sample to a fresh `ni` x `nj` grid covering the same physical
    /// extent.
    pub fn rebin(&self, ni: usize, nj: usize, policy: RebinPolicy) -> ImageGrid {
        let mut out = ImageGrid::new(ni, nj, self.width, self.height);
        self.rebin_into(&mut out, policy);
        out
    }
}

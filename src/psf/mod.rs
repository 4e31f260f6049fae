// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! PSF placement: the precomputed geometry and normalisation with which a
//! point source's flux is spread onto the super-resolution grid at each
//! multiple-image position.
//!
//! One cropped PSF is shared immutably by all multiple images. The placement
//! table is keyed per image so that a future perturbed-PSF-per-position can
//! slot in without redesign.


use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::{
    config::MultipleImage,
    constants::PSF_SCALE_TOLERANCE,
    grid::ImageGrid,
};

lazy_static::lazy_static! {
    pub(crate) static ref PSF_NORMALISATIONS: String = PsfNormalisation::iter().join(", ");
}

#[derive(Error, Debug)]
pub enum PsfError {
    #[error("The cropped PSF pixel scale ({psf:.6} arcsec) does not match the super-resolution grid scale ({grid:.6} arcsec) along {axis}")]
    ScaleMismatch {
        axis: char,
        psf: f64,
        grid: f64,
    },

    #[error("The PSF footprint of multiple image {image_index} has a non-positive partial sum ({sum}); cannot normalise the injected flux")]
    DegenerateFootprint { image_index: usize, sum: f64 },
}

/// The flux divisor applied when placing PSF-weighted point-source flux.
/// Both behaviours exist across pipeline variants and give different frames
/// whenever the PSF crop loses flux, so the choice is an explicit policy
/// rather than a hidden constant.
#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq)]
pub enum PsfNormalisation {
    /// Divide by the PSF flux actually captured by the (possibly clipped)
    /// footprint, so the total injected flux equals the target signal.
    #[strum(serialize = "partial-sum")]
    PartialSum,

    /// Divide by exactly 1.0, i.e. do not compensate for flux lost to
    /// cropping or clipping.
    #[strum(serialize = "unit")]
    Unit,
}

/// A band's cropped PSF raster. The raster arrives already at the
/// super-resolution pixel scale; this is checked on construction.
pub(crate) struct CroppedPsf {
    grid: ImageGrid,
}

impl CroppedPsf {
    pub(crate) fn new(grid: ImageGrid, super_dx: f64, super_dy: f64) -> Result<CroppedPsf, PsfError> {
        let check = |axis, psf: f64, target: f64| {
            if ((psf - target) / target).abs() > PSF_SCALE_TOLERANCE {
                Err(PsfError::ScaleMismatch {
                    axis,
                    psf,
                    grid: target,
                })
            } else {
                Ok(())
            }
        };
        check('x', grid.dx(), super_dx)?;
        check('y', grid.dy(), super_dy)?;
        Ok(CroppedPsf { grid })
    }

    pub(crate) fn ni(&self) -> usize {
        self.grid.ni()
    }

    pub(crate) fn nj(&self) -> usize {
        self.grid.nj()
    }

    pub(crate) fn as_flat(&self) -> &[f64] {
        self.grid.as_flat()
    }
}

/// The aligned offset/crop geometry and normalisation constant of one
/// multiple image against the super-resolution grid. Fully determines which
/// subregion of the grid receives PSF-weighted flux.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PsfPlacement {
    /// Flat base offset into the super-resolution grid.
    pub(crate) offset_image: usize,

    /// Flat base offset into the cropped PSF raster.
    pub(crate) offset_psf: usize,

    /// Rows of the clipped footprint; 0 when the footprint lies wholly
    /// outside the grid.
    pub(crate) ni: usize,

    /// Columns of the clipped footprint.
    pub(crate) nj: usize,

    /// Sum of the cropped-PSF pixels inside the clipped footprint. Less than
    /// the full PSF sum whenever the crop or the grid edge truncates flux.
    pub(crate) partial_sum: f64,
}

impl PsfPlacement {
    /// Centre the PSF raster on the super-resolution pixel containing
    /// (x, y) and clip its footprint to the grid.
    pub(crate) fn for_position(x: f64, y: f64, psf: &CroppedPsf, grid: &ImageGrid) -> PsfPlacement {
        let grid_ni = grid.ni() as i64;
        let grid_nj = grid.nj() as i64;
        let psf_ni = psf.ni() as i64;
        let psf_nj = psf.nj() as i64;

        // The pixel containing the sky position; row 0 is the top of the
        // field (maximum y).
        let jc = ((x + grid.width() / 2.0) / grid.dx()).floor() as i64;
        let ic = ((grid.height() / 2.0 - y) / grid.dy()).floor() as i64;

        let i0 = ic - psf_ni / 2;
        let j0 = jc - psf_nj / 2;
        let i_start = i0.max(0);
        let j_start = j0.max(0);
        let i_end = (i0 + psf_ni).min(grid_ni);
        let j_end = (j0 + psf_nj).min(grid_nj);

        let ni = (i_end - i_start).max(0) as usize;
        let nj = (j_end - j_start).max(0) as usize;
        if ni == 0 || nj == 0 {
            return PsfPlacement {
                offset_image: 0,
                offset_psf: 0,
                ni: 0,
                nj: 0,
                partial_sum: 0.0,
            };
        }

        let offset_image = (i_start * grid_nj + j_start) as usize;
        let offset_psf = ((i_start - i0) * psf_nj + (j_start - j0)) as usize;

        let psf_pixels = psf.as_flat();
        let mut partial_sum = 0.0;
        for i in 0..ni {
            for j in 0..nj {
                partial_sum += psf_pixels[offset_psf + i * psf.nj() + j];
            }
        }

        PsfPlacement {
            offset_image,
            offset_psf,
            ni,
            nj,
            partial_sum,
        }
    }

    /// The flux divisor under the given normalisation policy.
    pub(crate) fn divisor(&self, normalisation: PsfNormalisation) -> f64 {
        match normalisation {
            PsfNormalisation::PartialSum => self.partial_sum,
            PsfNormalisation::Unit => 1.0,
        }
    }
}

/// Build the per-image placement table for a band. Done once per band and
/// shared read-only across all mocks and timesteps.
pub(crate) fn build_placement_table(
    images: &[MultipleImage],
    psf: &CroppedPsf,
    grid: &ImageGrid,
    normalisation: PsfNormalisation,
) -> Result<Vec<PsfPlacement>, PsfError> {
    images
        .iter()
        .enumerate()
        .map(|(image_index, image)| {
            let placement = PsfPlacement::for_position(image.x, image.y, psf, grid);
            // A non-empty footprint with no captured flux cannot be
            // normalised by its partial sum.
            if matches!(normalisation, PsfNormalisation::PartialSum)
                && placement.ni * placement.nj > 0
                && placement.partial_sum <= 0.0
            {
                return Err(PsfError::DegenerateFootprint {
                    image_index,
                    sum: placement.partial_sum,
                });
            }
            Ok(placement)
        })
        .collect()
}

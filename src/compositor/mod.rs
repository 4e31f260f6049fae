// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-timestep frame composition: accumulate PSF-weighted point-source flux
//! into a super-resolution frame, merge it with the static base light and
//! down-sample to an observed-resolution magnitude image.


use crate::{
    grid::{GridError, ImageGrid, RebinPolicy},
    psf::{CroppedPsf, PsfNormalisation, PsfPlacement},
};

/// A reusable super-resolution frame. Allocated once per worker and zeroed
/// between timesteps, since the grids are roughly 100x the observed pixel
/// count and reallocating them per timestep dominates the runtime.
pub(crate) struct FrameBuffer {
    frame: ImageGrid,
}

impl FrameBuffer {
    pub(crate) fn new(ni: usize, nj: usize, width: f64, height: f64) -> FrameBuffer {
        FrameBuffer {
            frame: ImageGrid::new(ni, nj, width, height),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.frame.fill(0.0);
    }

    /// Add the PSF-weighted flux of every multiple image for one timestep.
    /// `signals` holds the combined (already magnified) flux per image.
    /// Summation is order-independent; overlapping footprints from blended
    /// images accumulate additively.
    pub(crate) fn accumulate(
        &mut self,
        placements: &[PsfPlacement],
        psf: &CroppedPsf,
        signals: &[f64],
        normalisation: PsfNormalisation,
    ) {
        debug_assert_eq!(placements.len(), signals.len());
        let frame_nj = self.frame.nj();
        let psf_nj = psf.nj();
        let psf_pixels = psf.as_flat();
        let frame = self.frame.as_flat_mut();

        for (placement, &signal) in placements.iter().zip(signals.iter()) {
            if placement.ni == 0 || placement.nj == 0 {
                continue;
            }
            let factor = signal / placement.divisor(normalisation);
            for i in 0..placement.ni {
                let frame_row = placement.offset_image + i * frame_nj;
                let psf_row = placement.offset_psf + i * psf_nj;
                for j in 0..placement.nj {
                    frame[frame_row + j] += factor * psf_pixels[psf_row + j];
                }
            }
        }
    }

    /// Finalise in flux space: rebin the point-source frame onto a copy of
    /// the pre-integrated observed base, then convert the observed frame to
    /// magnitudes. `obs_base` must itself be the `Integrate` rebinning of
    /// the static super-resolution base.
    pub(crate) fn finalise_integrate(&self, obs_base: &ImageGrid) -> Result<ImageGrid, GridError> {
        let mut obs = obs_base.clone();
        self.frame.rebin_into(&mut obs, RebinPolicy::Integrate);
        obs.to_magnitudes()?;
        Ok(obs)
    }

    /// Finalise in magnitude space: add the static super-resolution base
    /// pixelwise, convert the super-resolution frame to magnitudes, then
    /// `Mean`-rebin to observed resolution. Consumes the accumulated frame
    /// contents; callers reset the buffer before reuse.
    pub(crate) fn finalise_mean(
        &mut self,
        base: &ImageGrid,
        obs_ni: usize,
        obs_nj: usize,
    ) -> Result<ImageGrid, GridError> {
        self.frame.add_assign(base);
        self.frame.to_magnitudes()?;
        Ok(self.frame.rebin(obs_ni, obs_nj, RebinPolicy::Mean))
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All intensity calculations are done in double precision; conversion to
magnitudes only ever happens on final output products.
 */

/// The oversampling factor of the super-resolution grid relative to the
/// instrument pixel resolution, per axis.
pub(crate) const SUPER_FACTOR: usize = 10;

/// The relative tolerance when comparing the cropped-PSF pixel scale against
/// the super-resolution grid pixel scale.
pub(crate) const PSF_SCALE_TOLERANCE: f64 = 1e-3;

/// The file-name stem of observed-image products (e.g. `OBS_r_003.grid`).
pub(crate) const OBS_IMAGE_STEM: &str = "OBS";

/// The file-name stem of continuous light-curve products.
pub(crate) const LC_CONT_STEM: &str = "LCcont";

/// The file-name stem of sampled light-curve products.
pub(crate) const LC_SAMP_STEM: &str = "LCsamp";

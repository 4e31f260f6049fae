// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

/// Convert an astronomical magnitude to a linear flux (intensity).
///
/// # Examples
///
/// `assert_abs_diff_eq!(mag_to_flux(0.0), 1.0);`
#[inline]
pub(crate) fn mag_to_flux(mag: f64) -> f64 {
    10.0_f64.powf(-0.4 * mag)
}

/// Convert a linear flux (intensity) to an astronomical magnitude. The flux
/// must be strictly positive; callers are expected to have checked this.
///
/// # Examples
///
/// `assert_abs_diff_eq!(flux_to_mag(1.0), 0.0);`
#[inline]
pub(crate) fn flux_to_mag(flux: f64) -> f64 {
    -2.5 * flux.log10()
}

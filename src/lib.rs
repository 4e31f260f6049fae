// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Mock time-domain observations of strongly-lensed, time-variable point sources
(e.g. lensed quasars).

Given a static lensed-galaxy light model, the multiple-image parameters of a
lensed point source, and intrinsic/extrinsic light-curve realizations, this
crate produces per-band, per-epoch synthetic images and the accompanying
light curves, consistent with the optical system's PSF and pixel sampling.
 */

mod cli;
mod compositor;
mod config;
mod constants;
pub mod grid;
pub mod io;
mod lightcurve;
mod math;
mod params;
mod psf;
mod timeline;

pub use cli::{Lensmock, LensmockError};
pub use grid::{ImageGrid, RebinPolicy};

use crossbeam_utils::atomic::AtomicCell;

/// Are progress bars being drawn?
static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

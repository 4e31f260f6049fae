// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff: the binary `.grid` image format and the JSON light-curve
//! products.

mod error;
mod grid;
mod lightcurve;

pub use error::{FileWriteError, GridReadError};
pub use grid::{read_grid, write_grid};
pub(crate) use lightcurve::write_light_curves;

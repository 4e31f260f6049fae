// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing light-curve products: one JSON array over multiple images of
//! `{time[], signal[]}`, with the signal in linear flux units.

use std::{fs::File, io::BufWriter, path::Path};

use log::debug;

use super::FileWriteError;
use crate::lightcurve::LightCurve;

pub(crate) fn write_light_curves(
    path: &Path,
    curves: &[LightCurve],
) -> Result<(), FileWriteError> {
    let file = File::create(path).map_err(|err| FileWriteError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    serde_json::to_writer(BufWriter::new(file), curves).map_err(|err| FileWriteError::Json {
        path: path.to_path_buf(),
        err,
    })?;
    debug!(
        "Wrote {} light curve(s) to {}",
        curves.len(),
        path.display()
    );
    Ok(())
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The JSON documents consumed by `lensmock`: the main observation config,
//! the multiple-image parameters, and the intrinsic/extrinsic light-curve
//! realizations. Deep semantic validation of these documents belongs to the
//! stages that produce them; only the shapes are handled here.


use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use vec1::Vec1;

use crate::lightcurve::LightCurve;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't read {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },

    #[error("Couldn't parse {path} as JSON: {err}")]
    Json {
        path: PathBuf,
        err: serde_json::Error,
    },
}

/// The main observation config.
#[derive(Debug, Deserialize)]
pub(crate) struct ObsConfig {
    pub(crate) instrument: Instrument,

    /// When absent, only the static per-band images are produced.
    #[serde(default)]
    pub(crate) point_source: Option<PointSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Instrument {
    pub(crate) bands: Vec1<Band>,
}

/// One photometric band of the instrument. Immutable after load.
#[derive(Debug, Deserialize)]
pub(crate) struct Band {
    pub(crate) name: String,

    /// Field of view along x \[arcsec\].
    #[serde(rename = "field-of-view_x")]
    pub(crate) field_of_view_x: f64,

    /// Field of view along y \[arcsec\].
    #[serde(rename = "field-of-view_y")]
    pub(crate) field_of_view_y: f64,

    /// Pixel resolution \[arcsec/pixel\].
    pub(crate) resolution: f64,

    pub(crate) psf: PsfDims,

    /// Observed epochs \[days\].
    pub(crate) time: Vec1<f64>,
}

impl Band {
    /// Observed pixel counts along (y, x).
    pub(crate) fn obs_dims(&self) -> (usize, usize) {
        let res_x = (self.field_of_view_x / self.resolution).ceil() as usize;
        let res_y = (self.field_of_view_y / self.resolution).ceil() as usize;
        (res_y, res_x)
    }

    /// Super-resolution pixel counts along (y, x).
    pub(crate) fn super_dims(&self) -> (usize, usize) {
        let (res_y, res_x) = self.obs_dims();
        (
            crate::constants::SUPER_FACTOR * res_y,
            crate::constants::SUPER_FACTOR * res_x,
        )
    }
}

/// The dimensions of a band's PSF raster.
#[derive(Debug, Deserialize)]
pub(crate) struct PsfDims {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) pix_x: usize,
    pub(crate) pix_y: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PointSource {
    pub(crate) variability: Variability,

    /// Whether per-timestep observed-image cutouts are produced in addition
    /// to the light-curve products.
    #[serde(default)]
    pub(crate) output_cutouts: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Variability {
    pub(crate) intrinsic: VariabilityModel,
    pub(crate) extrinsic: VariabilityModel,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariabilityModel {
    /// The light-curve origin; "custom" curves are read from `input_files/`,
    /// anything else from the generated curves under `output/`.
    #[serde(rename = "type")]
    pub(crate) kind: String,
}

impl VariabilityModel {
    pub(crate) fn is_custom(&self) -> bool {
        self.kind == "custom"
    }
}

/// One lensed image of the point source.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct MultipleImage {
    /// Sky position \[arcsec\].
    pub(crate) x: f64,
    pub(crate) y: f64,

    /// Macroscopic lensing magnification; only its absolute value is ever
    /// applied.
    pub(crate) mag: f64,

    /// Time delay \[days\].
    pub(crate) dt: f64,
}

/// One light-curve realization: times \[days\] and signal samples.
#[derive(Debug, Deserialize)]
pub(crate) struct Realization {
    pub(crate) time: Vec<f64>,
    pub(crate) signal: Vec<f64>,
}

impl From<Realization> for LightCurve {
    fn from(r: Realization) -> LightCurve {
        LightCurve::new(r.time, r.signal)
    }
}

/// Intrinsic realizations, keyed by band name.
pub(crate) type IntrinsicDoc = IndexMap<String, Vec<Realization>>;

/// Extrinsic realizations, indexed by multiple image then keyed by band name.
/// An image without a microlensing curve has an empty (or absent)
/// realization list.
pub(crate) type ExtrinsicDoc = Vec<IndexMap<String, Vec<Realization>>>;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let file = File::open(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|err| ConfigError::Json {
        path: path.to_path_buf(),
        err,
    })
}

pub(crate) fn read_obs_config(path: &Path) -> Result<ObsConfig, ConfigError> {
    read_json(path)
}

pub(crate) fn read_multiple_images(path: &Path) -> Result<Vec<MultipleImage>, ConfigError> {
    read_json(path)
}

pub(crate) fn read_intrinsic_curves(path: &Path) -> Result<IntrinsicDoc, ConfigError> {
    read_json(path)
}

pub(crate) fn read_extrinsic_curves(path: &Path) -> Result<ExtrinsicDoc, ConfigError> {
    read_json(path)
}

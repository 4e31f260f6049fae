// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulateError {
    #[error("{path}: static image is {got_ni}x{got_nj} pixels, but band {band} needs a {expected_ni}x{expected_nj} super-resolution grid")]
    StaticDimensionMismatch {
        band: String,
        path: PathBuf,
        expected_ni: usize,
        expected_nj: usize,
        got_ni: usize,
        got_nj: usize,
    },

    #[error("No intrinsic light-curve realizations available for band {band}")]
    NoIntrinsicCurves { band: String },

    #[error("Multiple image {image_index} has {got} extrinsic realization(s) for band {band}, but other images have {expected}")]
    ExtrinsicCountMismatch {
        band: String,
        image_index: usize,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Timeline(#[from] crate::timeline::TimelineError),

    #[error(transparent)]
    Psf(#[from] crate::psf::PsfError),

    #[error(transparent)]
    Grid(#[from] crate::grid::GridError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    GridRead(#[from] crate::io::GridReadError),

    #[error(transparent)]
    FileWrite(#[from] crate::io::FileWriteError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

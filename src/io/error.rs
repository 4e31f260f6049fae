// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridReadError {
    #[error("Couldn't read {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },

    #[error("{path} is not a grid file (bad magic bytes)")]
    BadMagic { path: PathBuf },

    #[error("{path} has unsupported grid format version {version}")]
    UnsupportedVersion { path: PathBuf, version: u8 },

    #[error("{path} declares {ni}x{nj} pixels but a {width}x{height} arcsec extent; both must be positive")]
    BadDimensions {
        path: PathBuf,
        ni: u32,
        nj: u32,
        width: f64,
        height: f64,
    },
}

#[derive(Error, Debug)]
pub enum FileWriteError {
    #[error("Couldn't create directory {path}: {err}")]
    CreateDirectory {
        path: PathBuf,
        err: std::io::Error,
    },

    #[error("Couldn't write to {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },

    #[error("Couldn't serialise light curves for {path}: {err}")]
    Json {
        path: PathBuf,
        err: serde_json::Error,
    },
}

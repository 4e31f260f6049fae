// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all lensmock-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use crate::{config::ConfigError, params::SimulateError};

/// The *only* publicly visible error from lensmock.
#[derive(Error, Debug)]
pub enum LensmockError {
    /// An error related to the simulate subcommand.
    #[error("{0}")]
    Simulate(String),

    /// An error related to input documents.
    #[error("{0}")]
    Config(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<SimulateError> for LensmockError {
    fn from(e: SimulateError) -> Self {
        let s = e.to_string();
        match e {
            SimulateError::Config(_) => Self::Config(s),
            SimulateError::IO(_) => Self::Generic(s),
            SimulateError::StaticDimensionMismatch { .. }
            | SimulateError::NoIntrinsicCurves { .. }
            | SimulateError::ExtrinsicCountMismatch { .. }
            | SimulateError::Timeline(_)
            | SimulateError::Psf(_)
            | SimulateError::Grid(_)
            | SimulateError::GridRead(_)
            | SimulateError::FileWrite(_) => Self::Simulate(s),
        }
    }
}

impl From<ConfigError> for LensmockError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for LensmockError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Produce mock time-domain observations of a lensed point source.

use std::path::PathBuf;

use clap::Parser;
use log::debug;

use crate::{
    config::read_obs_config,
    grid::{RebinPolicy, REBIN_POLICIES},
    params::SimulateParams,
    psf::{PsfNormalisation, PSF_NORMALISATIONS},
    LensmockError,
};

lazy_static::lazy_static! {
    static ref REBIN_POLICY_HELP: String =
        format!("How super-resolution frames are down-sampled to observed resolution. Available: {}", *REBIN_POLICIES);

    static ref PSF_NORMALISATION_HELP: String =
        format!("How placed PSF flux is normalised. Available: {}", *PSF_NORMALISATIONS);
}

#[derive(Parser, Debug)]
pub(super) struct SimulateArgs {
    /// Path to the main observation config (JSON).
    #[clap(name = "CONFIG_FILE", parse(from_os_str))]
    config: PathBuf,

    /// The working directory; static images are read from its output/
    /// subdirectory, custom light curves and the PSF from input_files/, and
    /// mock directories are created inside it.
    #[clap(name = "WORKING_DIR", parse(from_os_str))]
    workdir: PathBuf,

    #[clap(long, default_value = "integrate", parse(try_from_str), help = REBIN_POLICY_HELP.as_str())]
    rebin_policy: RebinPolicy,

    #[clap(long, default_value = "partial-sum", parse(try_from_str), help = PSF_NORMALISATION_HELP.as_str())]
    psf_normalisation: PsfNormalisation,
}

impl SimulateArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), LensmockError> {
        let SimulateArgs {
            config,
            workdir,
            rebin_policy,
            psf_normalisation,
        } = self;

        debug!("Reading main config {}", config.display());
        let config = read_obs_config(&config)?;
        let params = SimulateParams {
            config,
            workdir,
            rebin_policy,
            psf_normalisation,
        };
        params.run(dry_run)?;
        Ok(())
    }
}

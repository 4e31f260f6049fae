// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Observed and continuous time grids, and the feasibility rules relating the
//! observing window, the maximum time delay and the intrinsic curve duration.

use log::warn;
use thiserror::Error;
use vec1::Vec1;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Observing period ({tobs_last} days) is shorter than the maximum time delay ({td_max} days); increase the observing time period")]
    InsufficientObservingWindow { td_max: f64, tobs_last: f64 },

    #[error("No observed epoch fits within the intrinsic light curve duration ({tmax_intrinsic} days) minus the maximum time delay ({td_max} days)")]
    NoUsableEpochs { td_max: f64, tmax_intrinsic: f64 },
}

/// The reconciled time axes of one band.
pub(crate) struct TimeGrids {
    /// The observed epochs \[days\], possibly truncated.
    pub(crate) tobs: Vec1<f64>,

    /// A daily-cadence axis spanning the (final) observed epochs, used for
    /// the continuous light-curve products.
    pub(crate) tcont: Vec<f64>,

    /// Whether the observed epochs were truncated because the intrinsic
    /// curves do not extend far enough.
    pub(crate) truncated: bool,
}

/// Build the observed and continuous time grids for one band.
///
/// `td_max` is the maximum time delay over all multiple images;
/// `tmax_intrinsic` is the last time reachable by every intrinsic
/// realization. An observing window shorter than `td_max` is fatal. An
/// intrinsic curve too short to support every time-delay shift truncates the
/// observed axis to the largest usable prefix, with a warning.
pub(crate) fn build_time_grids(
    tobs: &[f64],
    td_max: f64,
    tmax_intrinsic: f64,
) -> Result<TimeGrids, TimelineError> {
    let tobs_last = *tobs.last().expect("observed epochs are never empty");
    if td_max > tobs_last {
        return Err(TimelineError::InsufficientObservingWindow { td_max, tobs_last });
    }

    let mut tobs = tobs.to_vec();
    let mut truncated = false;
    if td_max + tobs_last > tmax_intrinsic {
        // Keep the largest prefix of epochs that the intrinsic curves can
        // cover at all time-delay shifts.
        let cutoff = tmax_intrinsic - td_max;
        let usable = tobs.partition_point(|&t| t < cutoff);
        if usable == 0 {
            return Err(TimelineError::NoUsableEpochs {
                td_max,
                tmax_intrinsic,
            });
        }
        tobs.truncate(usable);
        truncated = true;
        warn!(
            "Intrinsic light curve duration ({tmax_intrinsic} days) is shorter than the maximum time delay plus the observing period ({td_max} + {tobs_last} days)"
        );
        warn!(
            "Observing period is truncated to {} days ({usable} epochs)",
            tobs.last().unwrap()
        );
    }

    let t0 = tobs[0];
    let num_days = (tobs.last().unwrap() - t0).ceil() as usize;
    let tcont = (0..num_days).map(|k| t0 + k as f64).collect();

    Ok(TimeGrids {
        tobs: Vec1::try_from_vec(tobs).expect("at least one usable epoch"),
        tcont,
        truncated,
    })
}

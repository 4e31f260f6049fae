// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Light curves: ordered time series of brightness samples, and the
//! combination of intrinsic and extrinsic (microlensing) variability into
//! per-multiple-image flux series.

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::{config::MultipleImage, math::mag_to_flux};

/// An ordered sequence of (time, signal) samples. Time is monotonic
/// non-decreasing. A multiple image without a microlensing curve is
/// represented as `Option::<LightCurve>::None`, never as a curve of zeros.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct LightCurve {
    /// Sample times \[days\].
    pub(crate) time: Vec<f64>,

    /// Sampled signal; either magnitudes or linear flux depending on the
    /// pipeline stage.
    pub(crate) signal: Vec<f64>,
}

impl LightCurve {
    pub(crate) fn new(time: Vec<f64>, signal: Vec<f64>) -> LightCurve {
        debug_assert_eq!(time.len(), signal.len());
        LightCurve { time, signal }
    }

    /// The final sample time, i.e. the maximum time this curve can be
    /// interpolated at.
    pub(crate) fn last_time(&self) -> f64 {
        self.time.last().copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Convert the signal from magnitudes to linear flux, in place. This is
    /// done once per realization at ingest, never per combination.
    pub(crate) fn mag_to_flux(&mut self) {
        for s in self.signal.iter_mut() {
            *s = mag_to_flux(*s);
        }
    }

    /// Add a constant offset to every sample time. Extrinsic curves start at
    /// time zero, so their axes are shifted by the first observed epoch once
    /// at ingest.
    pub(crate) fn shift_times(&mut self, offset: f64) {
        for t in self.time.iter_mut() {
            *t += offset;
        }
    }

    /// Linearly interpolate this curve onto `axis`, reading the curve at
    /// `t + shift` for each target time `t`. Targets outside the sampled
    /// range are clamped to the first/last sample.
    pub(crate) fn sample_onto(&self, axis: &[f64], shift: f64) -> Vec<f64> {
        let mut out = Vec::with_capacity(axis.len());
        // Both the curve and the target axis are monotonic, so a single
        // forward sweep suffices.
        let mut k = 0;
        for &t in axis {
            let target = t + shift;
            while k + 1 < self.time.len() && self.time[k + 1] < target {
                k += 1;
            }
            out.push(self.value_between(k, target));
        }
        out
    }

    fn value_between(&self, k: usize, target: f64) -> f64 {
        if target <= self.time[0] {
            return self.signal[0];
        }
        if k + 1 >= self.time.len() {
            return self.signal[self.time.len() - 1];
        }
        let (t0, t1) = (self.time[k], self.time[k + 1]);
        let (s0, s1) = (self.signal[k], self.signal[k + 1]);
        if t1 <= t0 {
            return s0;
        }
        s0 + (s1 - s0) * ((target - t0) / (t1 - t0)).clamp(0.0, 1.0)
    }
}

/// Combine one intrinsic realization (already in flux space) with one set of
/// per-image extrinsic realizations, producing the combined flux series of
/// every multiple image on the given time axis.
///
/// The intrinsic curve is shifted by `td_max - dt[q]` per image, aligning the
/// most-delayed image with the observing origin. Images without an extrinsic
/// curve get the intrinsic-only combination; the microlensing factor is
/// omitted, not zeroed.
pub(crate) fn combine(
    intrinsic: &LightCurve,
    extrinsics: &[Option<&LightCurve>],
    images: &[MultipleImage],
    td_max: f64,
    axis: &[f64],
) -> Vec<LightCurve> {
    debug_assert_eq!(extrinsics.len(), images.len());
    images
        .iter()
        .zip(extrinsics.iter())
        .map(|(image, extrinsic)| {
            let macro_mag = image.mag.abs();
            let intrinsic_shifted = intrinsic.sample_onto(axis, td_max - image.dt);
            let signal = match extrinsic {
                Some(extrinsic) => {
                    let micro = extrinsic.sample_onto(axis, 0.0);
                    micro
                        .iter()
                        .zip(intrinsic_shifted.iter())
                        .map(|(m, i)| m * macro_mag * i)
                        .collect()
                }
                None => intrinsic_shifted
                    .iter()
                    .map(|i| macro_mag * i)
                    .collect(),
            };
            LightCurve::new(axis.to_vec(), signal)
        })
        .collect()
}

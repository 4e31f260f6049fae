// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::config::MultipleImage;

fn flat_curve(t_end: f64, value: f64) -> LightCurve {
    LightCurve::new(vec![0.0, t_end], vec![value, value])
}

#[test]
fn test_linear_interpolation() {
    let curve = LightCurve::new(vec![0.0, 10.0, 20.0], vec![0.0, 10.0, 0.0]);
    let sampled = curve.sample_onto(&[0.0, 5.0, 10.0, 15.0], 0.0);
    assert_abs_diff_eq!(sampled[0], 0.0);
    assert_abs_diff_eq!(sampled[1], 5.0);
    assert_abs_diff_eq!(sampled[2], 10.0);
    assert_abs_diff_eq!(sampled[3], 5.0);
}

#[test]
fn test_interpolation_with_shift() {
    let curve = LightCurve::new(vec![0.0, 10.0], vec![0.0, 10.0]);
    // Reading at t + 4.
    let sampled = curve.sample_onto(&[0.0, 2.0, 6.0], 4.0);
    assert_abs_diff_eq!(sampled[0], 4.0);
    assert_abs_diff_eq!(sampled[1], 6.0);
    assert_abs_diff_eq!(sampled[2], 10.0);
}

#[test]
fn test_interpolation_clamps_outside_sampled_range() {
    let curve = LightCurve::new(vec![5.0, 6.0], vec![2.0, 3.0]);
    let sampled = curve.sample_onto(&[0.0, 100.0], 0.0);
    assert_abs_diff_eq!(sampled[0], 2.0);
    assert_abs_diff_eq!(sampled[1], 3.0);
}

#[test]
fn test_mag_to_flux_conversion() {
    let mut curve = LightCurve::new(vec![0.0, 1.0], vec![0.0, -5.0]);
    curve.mag_to_flux();
    assert_abs_diff_eq!(curve.signal[0], 1.0);
    assert_abs_diff_eq!(curve.signal[1], 100.0, epsilon = 1e-10);
}

#[test]
fn test_combine_two_flat_images_without_microlensing() {
    // Two images with dt = {0, 5} and mag = {1.0, 0.5}; a flat intrinsic
    // curve at magnitude 0 (flux 1) gives constant combined fluxes of 1.0
    // and 0.5.
    let images = [
        MultipleImage {
            x: 0.0,
            y: 0.0,
            mag: 1.0,
            dt: 0.0,
        },
        MultipleImage {
            x: 1.0,
            y: 1.0,
            mag: 0.5,
            dt: 5.0,
        },
    ];
    let mut intrinsic = flat_curve(100.0, 0.0);
    intrinsic.mag_to_flux();
    let tobs: Vec<f64> = (0..=10).map(|t| t as f64).collect();

    let combined = combine(&intrinsic, &[None, None], &images, 5.0, &tobs);

    assert_eq!(combined.len(), 2);
    for t in 0..tobs.len() {
        assert_abs_diff_eq!(combined[0].signal[t], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(combined[1].signal[t], 0.5, epsilon = 1e-12);
    }
}

#[test]
fn test_combine_intrinsic_only_equals_scaled_shifted_intrinsic() {
    let images = [MultipleImage {
        x: 0.0,
        y: 0.0,
        mag: -2.0,
        dt: 3.0,
    }];
    let intrinsic = LightCurve::new(vec![0.0, 50.0], vec![1.0, 2.0]);
    let td_max = 10.0;
    let axis = [0.0, 5.0, 10.0];

    let combined = combine(&intrinsic, &[None], &images, td_max, &axis);

    // The magnification sign is dropped.
    let shifted = intrinsic.sample_onto(&axis, td_max - images[0].dt);
    for t in 0..axis.len() {
        assert_abs_diff_eq!(combined[0].signal[t], 2.0 * shifted[t], epsilon = 1e-12);
    }
}

#[test]
fn test_combine_applies_microlensing_factor() {
    let images = [MultipleImage {
        x: 0.0,
        y: 0.0,
        mag: 2.0,
        dt: 0.0,
    }];
    let intrinsic = flat_curve(100.0, 3.0);
    let extrinsic = flat_curve(100.0, 1.5);
    let axis = [0.0, 1.0, 2.0];

    let combined = combine(&intrinsic, &[Some(&extrinsic)], &images, 0.0, &axis);

    for t in 0..axis.len() {
        // extrinsic * |mag| * intrinsic.
        assert_abs_diff_eq!(combined[0].signal[t], 1.5 * 2.0 * 3.0, epsilon = 1e-12);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end tests driving the `simulate` subcommand against a synthetic
//! working directory.

use std::{fs::create_dir_all, path::Path};

use approx::assert_abs_diff_eq;
use assert_cmd::Command;
use ndarray::Array2;
use serde_json::Value;
use tempfile::TempDir;

use lensmock::{
    io::{read_grid, write_grid},
    ImageGrid,
};

fn flux_to_mag(flux: f64) -> f64 {
    -2.5 * flux.log10()
}

/// A 1x1 arcsec field at 0.1 arcsec resolution: 10x10 observed pixels,
/// 100x100 super-resolved.
fn write_config(dir: &Path, time: &str, point_source: bool, cutouts: bool) -> std::path::PathBuf {
    let point_source_block = if point_source {
        format!(
            r#",
  "point_source": {{
    "variability": {{
      "intrinsic": {{"type": "custom"}},
      "extrinsic": {{"type": "custom"}}
    }},
    "output_cutouts": {cutouts}
  }}"#
        )
    } else {
        String::new()
    };
    let config = format!(
        r#"{{
  "instrument": {{
    "bands": [
      {{
        "name": "test",
        "field-of-view_x": 1.0,
        "field-of-view_y": 1.0,
        "resolution": 0.1,
        "psf": {{"width": 0.1, "height": 0.1, "pix_x": 10, "pix_y": 10}},
        "time": {time}
      }}
    ]
  }}{point_source_block}
}}"#
    );
    let path = dir.join("obs.json");
    std::fs::write(&path, config).unwrap();
    path
}

/// The two static super-resolution grids, each a constant 1e-4 per pixel, so
/// their sum integrates to 2e-2 per observed pixel.
fn write_static_grids(workdir: &Path) {
    let output_dir = workdir.join("output");
    create_dir_all(&output_dir).unwrap();
    let grid = ImageGrid::from_data(Array2::from_elem((100, 100), 1e-4), 1.0, 1.0);
    write_grid(&output_dir.join("lensed_image_super.grid"), &grid).unwrap();
    write_grid(&output_dir.join("lens_light_super.grid"), &grid).unwrap();
}

/// A delta-function PSF at the super-resolution pixel scale.
fn write_delta_psf(workdir: &Path) {
    let input_dir = workdir.join("input_files");
    create_dir_all(&input_dir).unwrap();
    let psf = ImageGrid::from_data(
        Array2::from_shape_fn((10, 10), |(i, j)| if (i, j) == (5, 5) { 1.0 } else { 0.0 }),
        0.1,
        0.1,
    );
    write_grid(&input_dir.join("psf_test.grid"), &psf).unwrap();
}

/// One multiple image centred on super pixel (55, 55), magnification 2, no
/// delay; one flat intrinsic realization at magnitude 0 (flux 1); two flat
/// microlensing realizations of 1.5 and 3.0.
fn write_point_source_inputs(workdir: &Path) {
    std::fs::write(
        workdir.join("output").join("multiple_images.json"),
        r#"[{"x": 0.055, "y": -0.055, "mag": 2.0, "dt": 0.0}]"#,
    )
    .unwrap();
    std::fs::write(
        workdir.join("input_files").join("intrinsic_light_curves.json"),
        r#"{"test": [{"time": [0.0, 100.0], "signal": [0.0, 0.0]}]}"#,
    )
    .unwrap();
    std::fs::write(
        workdir.join("input_files").join("extrinsic_light_curves.json"),
        r#"[{"test": [
            {"time": [0.0, 100.0], "signal": [1.5, 1.5]},
            {"time": [0.0, 100.0], "signal": [3.0, 3.0]}
        ]}]"#,
    )
    .unwrap();
}

fn read_curves(path: &Path) -> Vec<(Vec<f64>, Vec<f64>)> {
    let doc: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    doc.as_array()
        .unwrap()
        .iter()
        .map(|curve| {
            let axis = |key: &str| -> Vec<f64> {
                curve[key]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|v| v.as_f64().unwrap())
                    .collect()
            };
            (axis("time"), axis("signal"))
        })
        .collect()
}

#[test]
fn test_static_only_observed_image() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path();
    write_static_grids(workdir);
    let config = write_config(workdir, "[0.0, 1.0, 2.5]", false, false);

    Command::cargo_bin("lensmock")
        .unwrap()
        .arg("simulate")
        .arg(&config)
        .arg(workdir)
        .arg("--no-progress-bars")
        .assert()
        .success();

    let obs = read_grid(&workdir.join("output").join("OBS_test.grid")).unwrap();
    assert_eq!((obs.ni(), obs.nj()), (10, 10));
    // Every observed pixel integrates 100 super pixels of 2e-4 flux.
    let expected = flux_to_mag(2e-2);
    for &pixel in obs.data() {
        assert_abs_diff_eq!(pixel, expected, epsilon = 1e-9);
    }
}

#[test]
fn test_mock_light_curves_and_frames() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path();
    write_static_grids(workdir);
    write_delta_psf(workdir);
    write_point_source_inputs(workdir);
    let config = write_config(workdir, "[0.0, 1.0, 2.5]", true, true);

    Command::cargo_bin("lensmock")
        .unwrap()
        .arg("simulate")
        .arg(&config)
        .arg(workdir)
        .arg("--no-progress-bars")
        .assert()
        .success();

    // 1 intrinsic x 2 extrinsic realizations. The combined flux of the single
    // image is micro * |mag| * intrinsic, constant in time.
    for (lc_ex, combined_flux) in [(0_usize, 3.0_f64), (1, 6.0)] {
        let mock_dir = workdir.join(format!("mock_0000_{lc_ex:04}"));

        let cont = read_curves(&mock_dir.join("LCcont_test.json"));
        assert_eq!(cont.len(), 1);
        let (time, signal) = &cont[0];
        // Daily cadence: ceil(2.5) = 3 points from the first epoch.
        assert_eq!(time, &[0.0, 1.0, 2.0]);
        for &s in signal {
            assert_abs_diff_eq!(s, combined_flux, epsilon = 1e-12);
        }

        let samp = read_curves(&mock_dir.join("LCsamp_test.json"));
        assert_eq!(samp.len(), 1);
        let (time, signal) = &samp[0];
        assert_eq!(time, &[0.0, 1.0, 2.5]);
        for &s in signal {
            assert_abs_diff_eq!(s, combined_flux, epsilon = 1e-12);
        }

        // One frame per epoch. The delta PSF puts all point-source flux into
        // observed pixel (5, 5); everything else is the static base.
        for timestep in 0..3 {
            let frame = read_grid(&mock_dir.join(format!("OBS_test_{timestep:03}.grid"))).unwrap();
            assert_eq!((frame.ni(), frame.nj()), (10, 10));
            assert_abs_diff_eq!(
                frame.data()[(5, 5)],
                flux_to_mag(2e-2 + combined_flux),
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(frame.data()[(0, 0)], flux_to_mag(2e-2), epsilon = 1e-9);

            // The frame conserves flux: base plus the injected signal.
            let total: f64 = frame
                .data()
                .iter()
                .map(|&mag| 10.0_f64.powf(-0.4 * mag))
                .sum();
            assert_abs_diff_eq!(total, 100.0 * 2e-2 + combined_flux, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_mean_rebinning_with_unit_normalisation() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path();
    write_static_grids(workdir);
    write_delta_psf(workdir);
    write_point_source_inputs(workdir);
    let config = write_config(workdir, "[0.0]", true, true);

    Command::cargo_bin("lensmock")
        .unwrap()
        .arg("simulate")
        .arg(&config)
        .arg(workdir)
        .arg("--no-progress-bars")
        .arg("--rebin-policy")
        .arg("mean")
        .arg("--psf-normalisation")
        .arg("unit")
        .assert()
        .success();

    // Under the mean policy the super-resolution frame is converted to
    // magnitudes first, then each observed pixel averages its 100 super
    // pixels.
    let frame = read_grid(&workdir.join("mock_0000_0000").join("OBS_test_000.grid")).unwrap();
    let base_mag = flux_to_mag(2e-4);
    assert_abs_diff_eq!(frame.data()[(0, 0)], base_mag, epsilon = 1e-9);
    let expected = (99.0 * base_mag + flux_to_mag(2e-4 + 3.0)) / 100.0;
    assert_abs_diff_eq!(frame.data()[(5, 5)], expected, epsilon = 1e-9);
}

#[test]
fn test_truncated_observing_window() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path();
    write_static_grids(workdir);
    write_delta_psf(workdir);
    write_point_source_inputs(workdir);
    // The intrinsic curves end at 100 days and the image has no delay, so
    // only epochs before 100 days survive.
    let config = write_config(workdir, "[0.0, 50.0, 150.0, 200.0]", true, false);

    let output = Command::cargo_bin("lensmock")
        .unwrap()
        .arg("simulate")
        .arg(&config)
        .arg(workdir)
        .arg("--no-progress-bars")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("truncated"));

    let samp = read_curves(&workdir.join("mock_0000_0000").join("LCsamp_test.json"));
    assert_eq!(samp[0].0, vec![0.0, 50.0]);
    let cont = read_curves(&workdir.join("mock_0000_0000").join("LCcont_test.json"));
    assert_eq!(cont[0].0.len(), 50);
    // No cutouts were requested.
    assert!(!workdir.join("mock_0000_0000").join("OBS_test_000.grid").exists());
}

#[test]
fn test_time_delay_shifts_the_intrinsic_curve() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path();
    write_static_grids(workdir);
    write_delta_psf(workdir);
    // Two images with delays 0 and 5 days, no microlensing. The intrinsic
    // realization ramps linearly in flux, so the delayed image reads the
    // curve 5 days earlier than the prompt one.
    std::fs::write(
        workdir.join("output").join("multiple_images.json"),
        r#"[
            {"x": 0.055, "y": -0.055, "mag": 1.0, "dt": 5.0},
            {"x": -0.055, "y": 0.055, "mag": 1.0, "dt": 0.0}
        ]"#,
    )
    .unwrap();
    let input_dir = workdir.join("input_files");
    create_dir_all(&input_dir).unwrap();
    // Magnitudes chosen so the flux ramps from 1 to 10 over 100 days.
    std::fs::write(
        input_dir.join("intrinsic_light_curves.json"),
        r#"{"test": [{"time": [0.0, 100.0], "signal": [0.0, -2.5]}]}"#,
    )
    .unwrap();
    std::fs::write(
        input_dir.join("extrinsic_light_curves.json"),
        r#"[{}, {}]"#,
    )
    .unwrap();
    let config = write_config(workdir, "[0.0, 10.0]", true, false);

    Command::cargo_bin("lensmock")
        .unwrap()
        .arg("simulate")
        .arg(&config)
        .arg(workdir)
        .arg("--no-progress-bars")
        .assert()
        .success();

    let samp = read_curves(&workdir.join("mock_0000_0000").join("LCsamp_test.json"));
    assert_eq!(samp.len(), 2);
    // The intrinsic flux ramp: magnitude 0 at t=0 to -2.5 at t=100 is flux
    // 1 + 9t/100 only in magnitude space; interpolation is linear in flux
    // after ingest conversion, i.e. flux(t) = 1 + (10 - 1) * t / 100.
    let flux_at = |t: f64| 1.0 + 9.0 * t / 100.0;
    // td_max = 5: the delayed image (dt = 5) is read with no shift, the
    // prompt image (dt = 0) is read 5 days late.
    let (_, delayed) = &samp[0];
    assert_abs_diff_eq!(delayed[0], flux_at(0.0), epsilon = 1e-12);
    assert_abs_diff_eq!(delayed[1], flux_at(10.0), epsilon = 1e-12);
    let (_, prompt) = &samp[1];
    assert_abs_diff_eq!(prompt[0], flux_at(5.0), epsilon = 1e-12);
    assert_abs_diff_eq!(prompt[1], flux_at(15.0), epsilon = 1e-12);
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path();
    write_static_grids(workdir);
    write_delta_psf(workdir);
    write_point_source_inputs(workdir);
    let config = write_config(workdir, "[0.0, 1.0, 2.5]", true, true);

    Command::cargo_bin("lensmock")
        .unwrap()
        .arg("simulate")
        .arg(&config)
        .arg(workdir)
        .arg("--no-progress-bars")
        .arg("--dry-run")
        .assert()
        .success();

    assert!(!workdir.join("mock_0000_0000").exists());
    assert!(!workdir.join("output").join("OBS_test.grid").exists());
}

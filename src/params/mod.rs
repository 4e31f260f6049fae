// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for a simulation run that have been parsed and checked, and
//! the orchestration that drives per-band setup, mock enumeration and frame
//! production.

mod error;

pub use error::SimulateError;

use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
    thread::{self, ScopedJoinHandle},
};

use crossbeam_channel::{bounded, Receiver};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::iproduct;
use log::{debug, info};
use rayon::prelude::*;
use scopeguard::defer_on_unwind;

use crate::{
    compositor::FrameBuffer,
    config::{
        read_extrinsic_curves, read_intrinsic_curves, read_multiple_images, Band, ExtrinsicDoc,
        IntrinsicDoc, MultipleImage, ObsConfig, PointSource,
    },
    constants::{LC_CONT_STEM, LC_SAMP_STEM, OBS_IMAGE_STEM},
    grid::{ImageGrid, RebinPolicy},
    io::{read_grid, write_grid, write_light_curves, FileWriteError},
    lightcurve::{combine, LightCurve},
    psf::{build_placement_table, CroppedPsf, PsfNormalisation, PsfPlacement},
    timeline::{build_time_grids, TimeGrids},
    PROGRESS_BARS,
};

/// Parameters needed to run a simulation.
pub(crate) struct SimulateParams {
    /// The main observation config.
    pub(crate) config: ObsConfig,

    /// The working directory holding `output/` and `input_files/`.
    pub(crate) workdir: PathBuf,

    /// How super-resolution frames are down-sampled to observed resolution.
    pub(crate) rebin_policy: RebinPolicy,

    /// How placed PSF flux is normalised.
    pub(crate) psf_normalisation: PsfNormalisation,
}

/// The point-source documents, read once and shared by all bands.
struct PointSourceInputs<'a> {
    point_source: &'a PointSource,
    images: Vec<MultipleImage>,
    intrinsic: IntrinsicDoc,
    extrinsic: ExtrinsicDoc,
}

/// One finished observed-resolution frame, en route to the writer thread.
struct FrameJob {
    lc_in: usize,
    lc_ex: usize,
    timestep: usize,
    image: ImageGrid,
}

impl SimulateParams {
    pub(crate) fn run(&self, dry_run: bool) -> Result<(), SimulateError> {
        let output_dir = self.workdir.join("output");
        let input_dir = self.workdir.join("input_files");

        let inputs = match self.config.point_source.as_ref() {
            Some(point_source) => {
                let images = read_multiple_images(&output_dir.join("multiple_images.json"))?;
                let intrinsic_path = if point_source.variability.intrinsic.is_custom() {
                    input_dir.join("intrinsic_light_curves.json")
                } else {
                    output_dir.join("intrinsic_light_curves.json")
                };
                let extrinsic_path = if point_source.variability.extrinsic.is_custom() {
                    input_dir.join("extrinsic_light_curves.json")
                } else {
                    output_dir.join("extrinsic_light_curves.json")
                };
                let intrinsic = read_intrinsic_curves(&intrinsic_path)?;
                let extrinsic = read_extrinsic_curves(&extrinsic_path)?;
                info!(
                    "Read {} multiple image(s) and light curves for {} band(s)",
                    images.len(),
                    intrinsic.len()
                );
                Some(PointSourceInputs {
                    point_source,
                    images,
                    intrinsic,
                    extrinsic,
                })
            }
            None => None,
        };

        for band in &self.config.instrument.bands {
            self.process_band(band, inputs.as_ref(), &output_dir, &input_dir, dry_run)?;
        }

        Ok(())
    }

    /// Read the static super-resolution inputs of a band and sum them into
    /// the base grid shared by all timesteps.
    fn read_static_base(&self, band: &Band, output_dir: &Path) -> Result<ImageGrid, SimulateError> {
        let (super_ni, super_nj) = band.super_dims();
        let mut base: Option<ImageGrid> = None;
        for name in ["lensed_image_super.grid", "lens_light_super.grid"] {
            let path = output_dir.join(name);
            let grid = read_grid(&path)?;
            if (grid.ni(), grid.nj()) != (super_ni, super_nj) {
                return Err(SimulateError::StaticDimensionMismatch {
                    band: band.name.clone(),
                    path,
                    expected_ni: super_ni,
                    expected_nj: super_nj,
                    got_ni: grid.ni(),
                    got_nj: grid.nj(),
                });
            }
            match base.as_mut() {
                Some(base) => base.add_assign(&grid),
                None => base = Some(grid),
            }
        }
        Ok(base.expect("two static inputs were read"))
    }

    fn process_band(
        &self,
        band: &Band,
        inputs: Option<&PointSourceInputs>,
        output_dir: &Path,
        input_dir: &Path,
        dry_run: bool,
    ) -> Result<(), SimulateError> {
        let (obs_ni, obs_nj) = band.obs_dims();
        let (super_ni, super_nj) = band.super_dims();
        info!(
            "Band {}: {obs_nj}x{obs_ni} pixels observed, {super_nj}x{super_ni} super-resolved",
            band.name
        );

        let base = self.read_static_base(band, output_dir)?;

        let Some(inputs) = inputs else {
            // Static-only: down-sample the base and write it directly.
            if dry_run {
                info!("Dry run; not writing the static image for band {}", band.name);
                return Ok(());
            }
            let mut obs = base.rebin(obs_ni, obs_nj, RebinPolicy::Integrate);
            obs.to_magnitudes()?;
            let path = output_dir.join(format!("{OBS_IMAGE_STEM}_{}.grid", band.name));
            write_grid(&path, &obs)?;
            info!("Wrote static observed image for band {}", band.name);
            return Ok(());
        };
        let PointSourceInputs {
            point_source,
            images,
            intrinsic,
            extrinsic,
        } = inputs;

        let td_max = images.iter().fold(0.0, |acc: f64, image| acc.max(image.dt));

        // Intrinsic realizations arrive in magnitudes; convert to flux once
        // per realization.
        let intrinsic_curves: Vec<LightCurve> = intrinsic
            .get(&band.name)
            .map(|realizations| {
                realizations
                    .iter()
                    .map(|r| {
                        let mut curve = LightCurve::new(r.time.clone(), r.signal.clone());
                        curve.mag_to_flux();
                        curve
                    })
                    .collect()
            })
            .unwrap_or_default();
        if intrinsic_curves.is_empty() {
            return Err(SimulateError::NoIntrinsicCurves {
                band: band.name.clone(),
            });
        }
        let tmax_intrinsic = intrinsic_curves
            .iter()
            .map(LightCurve::last_time)
            .fold(f64::INFINITY, f64::min);

        let grids = build_time_grids(band.time.as_slice(), td_max, tmax_intrinsic)?;
        let tobs_origin = grids.tobs[0];

        // Extrinsic curves start at time zero; shift them onto the observed
        // axis once at ingest. An image without any realization for this
        // band stays `None` for every mock.
        let extrinsic_curves: Vec<Option<Vec<LightCurve>>> = images
            .iter()
            .enumerate()
            .map(|(q, _)| {
                let realizations = extrinsic
                    .get(q)
                    .and_then(|per_band| per_band.get(&band.name))
                    .filter(|list| !list.is_empty());
                realizations.map(|list| {
                    list.iter()
                        .map(|r| {
                            let mut curve = LightCurve::new(r.time.clone(), r.signal.clone());
                            curve.shift_times(tobs_origin);
                            curve
                        })
                        .collect()
                })
            })
            .collect();

        // The realization count comes from the images that have curves; with
        // no microlensing at all, a single intrinsic-only mock per intrinsic
        // realization remains.
        let num_ex = extrinsic_curves
            .iter()
            .flatten()
            .map(Vec::len)
            .max()
            .unwrap_or(1);
        for (image_index, list) in extrinsic_curves.iter().enumerate() {
            if let Some(list) = list {
                if list.len() != num_ex {
                    return Err(SimulateError::ExtrinsicCountMismatch {
                        band: band.name.clone(),
                        image_index,
                        expected: num_ex,
                        got: list.len(),
                    });
                }
            }
        }
        let num_in = intrinsic_curves.len();

        let psf_grid = read_grid(&input_dir.join(format!("psf_{}.grid", band.name)))?;
        let psf = CroppedPsf::new(psf_grid, base.dx(), base.dy())?;
        let placements = build_placement_table(images, &psf, &base, self.psf_normalisation)?;

        info!(
            "Band {}: {num_in} intrinsic x {num_ex} extrinsic realization(s), {} epoch(s){}",
            band.name,
            grids.tobs.len(),
            if grids.truncated { " (truncated)" } else { "" },
        );

        if dry_run {
            info!("Dry run; not producing mocks for band {}", band.name);
            return Ok(());
        }

        let mock_indices: Vec<(usize, usize)> = iproduct!(0..num_in, 0..num_ex).collect();
        let multi_progress = MultiProgress::with_draw_target(if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        });
        let lc_progress = multi_progress.add(
            ProgressBar::new(mock_indices.len() as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:4}/{len:4} mocks ({elapsed_precise}<{eta_precise})")
                        .unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Mock light curves"),
        );

        // Stage one: the combined light curves of every mock, on both time
        // axes. The sampled series feed stage two.
        let sampled: Vec<Vec<LightCurve>> = mock_indices
            .par_iter()
            .map(|&(lc_in, lc_ex)| -> Result<Vec<LightCurve>, SimulateError> {
                let mock_dir = self.workdir.join(format!("mock_{lc_in:04}_{lc_ex:04}"));
                create_dir_all(&mock_dir).map_err(|err| FileWriteError::CreateDirectory {
                    path: mock_dir.clone(),
                    err,
                })?;
                let extrinsics: Vec<Option<&LightCurve>> = extrinsic_curves
                    .iter()
                    .map(|list| list.as_ref().map(|list| &list[lc_ex]))
                    .collect();

                let cont = combine(
                    &intrinsic_curves[lc_in],
                    &extrinsics,
                    images,
                    td_max,
                    &grids.tcont,
                );
                write_light_curves(
                    &mock_dir.join(format!("{LC_CONT_STEM}_{}.json", band.name)),
                    &cont,
                )?;

                let samp = combine(
                    &intrinsic_curves[lc_in],
                    &extrinsics,
                    images,
                    td_max,
                    grids.tobs.as_slice(),
                );
                write_light_curves(
                    &mock_dir.join(format!("{LC_SAMP_STEM}_{}.json", band.name)),
                    &samp,
                )?;

                lc_progress.inc(1);
                Ok(samp)
            })
            .collect::<Result<_, SimulateError>>()?;
        lc_progress.abandon_with_message("Finished mock light curves");

        if point_source.output_cutouts {
            self.write_cutouts(
                band,
                &grids,
                &base,
                &psf,
                &placements,
                &mock_indices,
                &sampled,
                &multi_progress,
            )?;
        }

        Ok(())
    }

    /// Stage two: one observed-resolution frame per (mock, timestep). The
    /// task list is explicit and the products are named by indices alone, so
    /// output is deterministic regardless of execution order.
    #[allow(clippy::too_many_arguments)]
    fn write_cutouts(
        &self,
        band: &Band,
        grids: &TimeGrids,
        base: &ImageGrid,
        psf: &CroppedPsf,
        placements: &[PsfPlacement],
        mock_indices: &[(usize, usize)],
        sampled: &[Vec<LightCurve>],
        multi_progress: &MultiProgress,
    ) -> Result<(), SimulateError> {
        let (obs_ni, obs_nj) = band.obs_dims();
        let (super_ni, super_nj) = band.super_dims();
        // The observed base is fixed within a band; under the integrating
        // policy it is down-sampled exactly once.
        let obs_base = match self.rebin_policy {
            RebinPolicy::Integrate => Some(base.rebin(obs_ni, obs_nj, RebinPolicy::Integrate)),
            RebinPolicy::Mean => None,
        };

        let tasks: Vec<(usize, usize)> =
            iproduct!(0..mock_indices.len(), 0..grids.tobs.len()).collect();
        debug!(
            "Band {}: compositing {} frame(s) ({} mocks x {} timesteps)",
            band.name,
            tasks.len(),
            mock_indices.len(),
            grids.tobs.len()
        );
        let write_progress = multi_progress.add(
            ProgressBar::new(tasks.len() as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:4}/{len:4} frames ({elapsed_precise}<{eta_precise})")
                        .unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Frame writing"),
        );

        // Composite frames in parallel and write them out asynchronously.
        let error = AtomicCell::new(false);
        let scoped_threads_result: Result<(), SimulateError> = thread::scope(|scope| {
            let (tx_frame, rx_frame) = bounded(5);

            let write_handle: ScopedJoinHandle<Result<(), FileWriteError>> =
                thread::Builder::new()
                    .name("write".to_string())
                    .spawn_scoped(scope, || {
                        defer_on_unwind! { error.store(true); }
                        write_progress.tick();
                        let result = frame_writer(
                            rx_frame,
                            &self.workdir,
                            &band.name,
                            &error,
                            &write_progress,
                        );
                        if result.is_err() {
                            error.store(true);
                        }
                        result
                    })
                    .expect("OS can create threads");

            let compute_result = tasks.par_iter().try_for_each_init(
                || {
                    FrameBuffer::new(
                        super_ni,
                        super_nj,
                        band.field_of_view_x,
                        band.field_of_view_y,
                    )
                },
                |frame, &(mock, timestep)| -> Result<(), SimulateError> {
                    // Should we continue?
                    if error.load() {
                        return Ok(());
                    }

                    let signals: Vec<f64> = sampled[mock]
                        .iter()
                        .map(|curve| curve.signal[timestep])
                        .collect();
                    frame.reset();
                    frame.accumulate(placements, psf, &signals, self.psf_normalisation);
                    let image = match (self.rebin_policy, obs_base.as_ref()) {
                        (RebinPolicy::Integrate, Some(obs_base)) => {
                            frame.finalise_integrate(obs_base)?
                        }
                        _ => frame.finalise_mean(base, obs_ni, obs_nj)?,
                    };

                    let (lc_in, lc_ex) = mock_indices[mock];
                    // A closed channel means the writer has exited on error;
                    // there is nothing more to do on this side.
                    let _ = tx_frame.send(FrameJob {
                        lc_in,
                        lc_ex,
                        timestep,
                        image,
                    });
                    Ok(())
                },
            );
            drop(tx_frame);
            if compute_result.is_err() {
                error.store(true);
            }

            write_handle.join().unwrap()?;
            compute_result
        });
        scoped_threads_result?;

        info!("Band {}: wrote {} frame(s)", band.name, tasks.len());
        Ok(())
    }
}

fn frame_writer(
    rx: Receiver<FrameJob>,
    workdir: &Path,
    band_name: &str,
    error: &AtomicCell<bool>,
    progress_bar: &ProgressBar,
) -> Result<(), FileWriteError> {
    for job in rx.iter() {
        // Should we continue?
        if error.load() {
            return Ok(());
        }

        let path = workdir
            .join(format!("mock_{:04}_{:04}", job.lc_in, job.lc_ex))
            .join(format!(
                "{OBS_IMAGE_STEM}_{band_name}_{:03}.grid",
                job.timestep
            ));
        write_grid(&path, &job.image)?;
        progress_bar.inc(1);
    }

    progress_bar.abandon_with_message("Finished writing frames");
    Ok(())
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The binary `.grid` image format: little-endian, a magic string, a format
//! version, the pixel counts and physical extent, then the row-major pixel
//! values.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;
use ndarray::Array2;

use super::{FileWriteError, GridReadError};
use crate::grid::ImageGrid;

const GRID_MAGIC: &[u8; 6] = b"LMGRID";
const GRID_VERSION: u8 = 1;

pub fn read_grid(path: &Path) -> Result<ImageGrid, GridReadError> {
    let io_err = |err| GridReadError::Io {
        path: path.to_path_buf(),
        err,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0_u8; 6];
    reader.read_exact(&mut magic).map_err(io_err)?;
    if &magic != GRID_MAGIC {
        return Err(GridReadError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    let version = reader.read_u8().map_err(io_err)?;
    if version != GRID_VERSION {
        return Err(GridReadError::UnsupportedVersion {
            path: path.to_path_buf(),
            version,
        });
    }

    let ni = reader.read_u32::<LittleEndian>().map_err(io_err)?;
    let nj = reader.read_u32::<LittleEndian>().map_err(io_err)?;
    let width = reader.read_f64::<LittleEndian>().map_err(io_err)?;
    let height = reader.read_f64::<LittleEndian>().map_err(io_err)?;
    if ni == 0 || nj == 0 || width <= 0.0 || height <= 0.0 {
        return Err(GridReadError::BadDimensions {
            path: path.to_path_buf(),
            ni,
            nj,
            width,
            height,
        });
    }

    let num_pixels = ni as usize * nj as usize;
    let mut pixels = vec![0.0; num_pixels];
    reader
        .read_f64_into::<LittleEndian>(&mut pixels)
        .map_err(io_err)?;

    trace!("Read {ni}x{nj} grid from {}", path.display());
    let data = Array2::from_shape_vec((ni as usize, nj as usize), pixels)
        .expect("shape matches the pixel count");
    Ok(ImageGrid::from_data(data, width, height))
}

pub fn write_grid(path: &Path, grid: &ImageGrid) -> Result<(), FileWriteError> {
    let io_err = |err| FileWriteError::Io {
        path: path.to_path_buf(),
        err,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(GRID_MAGIC).map_err(io_err)?;
    writer.write_u8(GRID_VERSION).map_err(io_err)?;
    writer
        .write_u32::<LittleEndian>(grid.ni() as u32)
        .map_err(io_err)?;
    writer
        .write_u32::<LittleEndian>(grid.nj() as u32)
        .map_err(io_err)?;
    writer
        .write_f64::<LittleEndian>(grid.width())
        .map_err(io_err)?;
    writer
        .write_f64::<LittleEndian>(grid.height())
        .map_err(io_err)?;
    for &pixel in grid.as_flat() {
        writer.write_f64::<LittleEndian>(pixel).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;

    trace!(
        "Wrote {}x{} grid to {}",
        grid.ni(),
        grid.nj(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_round_trip() {
        let tmp_dir = tempfile::TempDir::new().unwrap();
        let path = tmp_dir.path().join("round_trip.grid");

        let mut grid = ImageGrid::new(3, 4, 1.5, 2.0);
        for (index, pixel) in grid.as_flat_mut().iter_mut().enumerate() {
            *pixel = index as f64 * 0.25;
        }
        write_grid(&path, &grid).unwrap();
        let read_back = read_grid(&path).unwrap();

        assert_eq!(read_back.ni(), 3);
        assert_eq!(read_back.nj(), 4);
        assert_abs_diff_eq!(read_back.width(), 1.5);
        assert_abs_diff_eq!(read_back.height(), 2.0);
        for (&a, &b) in grid.as_flat().iter().zip(read_back.as_flat()) {
            assert_abs_diff_eq!(a, b);
        }
    }

    #[test]
    fn test_corrupt_header_is_rejected() {
        let tmp_dir = tempfile::TempDir::new().unwrap();
        let path = tmp_dir.path().join("not_a_grid.grid");
        std::fs::write(&path, b"GARBAGE DATA").unwrap();
        assert!(matches!(
            read_grid(&path),
            Err(GridReadError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let tmp_dir = tempfile::TempDir::new().unwrap();
        let path = tmp_dir.path().join("future.grid");
        let mut bytes = GRID_MAGIC.to_vec();
        bytes.push(99);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_grid(&path),
            Err(GridReadError::UnsupportedVersion { version: 99, .. })
        ));
    }

    #[test]
    fn test_truncated_payload_is_an_io_error() {
        let tmp_dir = tempfile::TempDir::new().unwrap();
        let path = tmp_dir.path().join("trunc.grid");
        let grid = ImageGrid::new(4, 4, 1.0, 1.0);
        write_grid(&path, &grid).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        assert!(matches!(read_grid(&path), Err(GridReadError::Io { .. })));
    }
}

//! Decoder for the gzip-compressed IDX archives MNIST is distributed in.
//!
//! # Format
//! After decompression an archive consists of:
//! * 32-bit big-endian magic number (2051 for images, 2049 for labels)
//! * 32-bit big-endian item count
//! * for images only: 32-bit big-endian row and column counts
//! * the payload, one unsigned byte per pixel or label, in row-major order
//!
//! Image dimensions are taken from the header, never assumed to be 28x28.
//! Payloads shorter than the header promises are rejected as truncated.

use crate::dataset::Labels;
use crate::error::MnistError;
use crate::one_hot::{dense_to_one_hot, NUM_CLASSES};
use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use log::info;
use ndarray::{Array1, Array4};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub const IMAGE_MAGIC_NUMBER: u32 = 2051;
pub const LABEL_MAGIC_NUMBER: u32 = 2049;

const IMAGES: &str = "images";
const LABELS: &str = "labels";

/// Reads exactly `buffer.len()` bytes, reporting a short read as truncation.
fn read_full<R: Read>(
    reader: &mut R,
    buffer: &mut [u8],
    kind: &'static str,
    path: &Path,
) -> Result<(), MnistError> {
    let mut filled = 0;
    while filled < buffer.len() {
        let Some(rest) = buffer.get_mut(filled..) else {
            break;
        };
        match reader.read(rest) {
            Ok(0) => {
                return Err(MnistError::Truncated {
                    kind,
                    path: path.to_path_buf(),
                    expected: buffer.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Reads a 32-bit unsigned integer in big-endian format
fn read_u32<R: Read>(reader: &mut R, kind: &'static str, path: &Path) -> Result<u32, MnistError> {
    let mut buffer = [0; 4];
    read_full(reader, &mut buffer, kind, path)?;
    Ok(u32::from_be_bytes(buffer))
}

fn check_magic_number<R: Read>(
    reader: &mut R,
    kind: &'static str,
    expected: u32,
    path: &Path,
) -> Result<(), MnistError> {
    let actual = read_u32(reader, kind, path)?;
    if actual != expected {
        return Err(MnistError::InvalidMagicNumber {
            kind,
            expected,
            actual,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Reads `len` payload bytes, one progress tick per `chunk` bytes.
///
/// The buffer only grows with bytes actually read from `reader`.
fn read_payload<R: Read>(
    reader: &mut R,
    len: usize,
    chunk: usize,
    kind: &'static str,
    path: &Path,
    progress: &ProgressBar,
) -> Result<Vec<u8>, MnistError> {
    let chunk = chunk.max(1) as u64;
    let mut payload = Vec::new();
    while payload.len() < len {
        let remaining = (len - payload.len()) as u64;
        let read = reader
            .by_ref()
            .take(remaining.min(chunk))
            .read_to_end(&mut payload)?;
        if read == 0 {
            return Err(MnistError::Truncated {
                kind,
                path: path.to_path_buf(),
                expected: len,
                actual: payload.len(),
            });
        }
        progress.inc(1);
    }
    Ok(payload)
}

/// Multiplies header dimensions, rejecting products that overflow `usize`.
fn payload_len(dims: &[usize], kind: &'static str, path: &Path) -> Result<usize, MnistError> {
    dims.iter()
        .try_fold(1usize, |len, &dim| len.checked_mul(dim))
        .ok_or_else(|| MnistError::InvalidDimensions {
            kind,
            dims: dims.to_vec(),
            path: path.to_path_buf(),
        })
}

/// Decodes an uncompressed IDX image stream into a `(count, rows, cols, 1)` tensor.
///
/// `path` is only used to label errors.
pub fn decode_images<R: Read>(
    mut reader: R,
    path: &Path,
    progress: &ProgressBar,
) -> Result<Array4<u8>, MnistError> {
    check_magic_number(&mut reader, IMAGES, IMAGE_MAGIC_NUMBER, path)?;

    let num_images = read_u32(&mut reader, IMAGES, path)? as usize;
    let rows = read_u32(&mut reader, IMAGES, path)? as usize;
    let cols = read_u32(&mut reader, IMAGES, path)? as usize;
    let pixels_per_image = payload_len(&[rows, cols], IMAGES, path)?;
    let len = payload_len(&[num_images, rows, cols], IMAGES, path)?;

    progress.set_length(num_images as u64);
    progress.set_message("Loading images...");

    let pixels = read_payload(
        &mut reader,
        len,
        pixels_per_image,
        IMAGES,
        path,
        progress,
    )?;
    let images = Array4::from_shape_vec((num_images, rows, cols, 1), pixels)?;

    progress.finish_with_message("Images loaded successfully");
    Ok(images)
}

/// Decodes an uncompressed IDX label stream into a vector of class indices.
pub fn decode_labels<R: Read>(
    mut reader: R,
    path: &Path,
    progress: &ProgressBar,
) -> Result<Array1<u8>, MnistError> {
    check_magic_number(&mut reader, LABELS, LABEL_MAGIC_NUMBER, path)?;

    let num_labels = read_u32(&mut reader, LABELS, path)? as usize;
    progress.set_length(1);
    progress.set_message("Loading labels...");

    let labels = read_payload(&mut reader, num_labels, num_labels, LABELS, path, progress)?;

    progress.finish_with_message("Labels loaded successfully");
    Ok(Array1::from(labels))
}

fn open_archive(path: &Path) -> Result<GzDecoder<BufReader<File>>, MnistError> {
    info!("Extracting {}", path.display());
    let file = File::open(path)?;
    Ok(GzDecoder::new(BufReader::new(file)))
}

/// Extracts the images of a gzip-compressed IDX archive into a 4D `[index, y, x, depth]` tensor.
///
/// # Arguments
/// * `path` - Path to the `.gz` image archive
/// * `progress` - Progress bar for tracking loading progress
///
/// # Returns
/// * `Ok(Array4<u8>)` shaped `(count, rows, cols, 1)`
/// * `Err(MnistError::InvalidMagicNumber)` if the magic number is not 2051
/// * `Err(MnistError::Truncated)` if the archive ends early
pub fn extract_images(
    path: impl AsRef<Path>,
    progress: &ProgressBar,
) -> Result<Array4<u8>, MnistError> {
    let path = path.as_ref();
    decode_images(open_archive(path)?, path, progress)
}

/// Extracts the labels of a gzip-compressed IDX archive.
///
/// # Arguments
/// * `path` - Path to the `.gz` label archive
/// * `one_hot` - Expand labels into one-hot rows of `NUM_CLASSES` columns
/// * `progress` - Progress bar for tracking loading progress
///
/// # Returns
/// * `Ok(Labels::OneHot)` or `Ok(Labels::Dense)` depending on `one_hot`
/// * `Err(MnistError::InvalidMagicNumber)` if the magic number is not 2049
/// * `Err(MnistError::Truncated)` if the archive ends early
pub fn extract_labels(
    path: impl AsRef<Path>,
    one_hot: bool,
    progress: &ProgressBar,
) -> Result<Labels, MnistError> {
    let path = path.as_ref();
    let labels = decode_labels(open_archive(path)?, path, progress)?;
    if one_hot {
        return Ok(Labels::OneHot(dense_to_one_hot(labels.view(), NUM_CLASSES)));
    }
    Ok(Labels::Dense(labels))
}

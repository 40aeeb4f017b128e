use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching, decoding or serving MNIST data
#[derive(Debug, Error)]
pub enum MnistError {
    /// Wrapper for standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Transport failure while downloading an archive
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Error for invalid magic numbers in MNIST files
    #[error("Invalid magic number {actual} in MNIST {kind} file {}: expected {expected}", .path.display())]
    InvalidMagicNumber {
        kind: &'static str,
        expected: u32,
        actual: u32,
        path: PathBuf,
    },
    /// The archive ended before the header or payload was complete
    #[error("Truncated MNIST {kind} file {}: expected {expected} bytes, got {actual}", .path.display())]
    Truncated {
        kind: &'static str,
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    /// Header dimensions whose payload size does not fit in memory
    #[error("Invalid MNIST {kind} dimensions {dims:?} in {}", .path.display())]
    InvalidDimensions {
        kind: &'static str,
        dims: Vec<usize>,
        path: PathBuf,
    },
    /// Error for mismatches between images and labels
    #[error("Data mismatch: images.shape: {images:?}, labels.shape: {labels:?}")]
    DataMismatch {
        images: Vec<usize>,
        labels: Vec<usize>,
    },
    /// Image tensors must carry a single (grayscale) channel
    #[error("Invalid channel count: expected 1, got {channels}")]
    InvalidChannels { channels: usize },
    /// Requested batch is larger than the data set
    #[error("batch_size ({batch_size}) bigger than data size ({num_examples})")]
    BatchTooLarge {
        batch_size: usize,
        num_examples: usize,
    },
    /// Validation split does not fit inside the training archive
    #[error("Validation size {validation_size} exceeds {num_examples} training examples")]
    InvalidValidationSize {
        validation_size: usize,
        num_examples: usize,
    },
    /// Malformed loader configuration
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    /// Header dimensions that cannot describe the payload
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

use crate::error::MnistError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Remote directory holding the four canonical MNIST archives.
pub const SOURCE_URL: &str = "http://yann.lecun.com/exdb/mnist/";

/// Number of leading training examples held out for validation.
pub const VALIDATION_SIZE: usize = 5000;

/// Settings for locating, decoding and splitting the MNIST archives.
///
/// Every field has a default, so a configuration file only needs to name
/// the values it changes.
///
/// # Example
///
/// ```
/// use mnist_data::LoaderConfig;
///
/// let config = LoaderConfig::default();
/// assert_eq!(config.validation_size, 5000);
/// assert!(config.one_hot);
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Base URL the archive filenames are appended to.
    pub source_url: String,

    /// Local directory the archives are cached in.
    pub train_dir: PathBuf,

    /// Number of training examples carved off into the validation split.
    pub validation_size: usize,

    /// Whether labels are expanded into one-hot rows.
    pub one_hot: bool,

    /// Seed for the shuffling generator. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl LoaderConfig {
    /// Creates a default configuration caching archives in `train_dir`.
    pub fn new(train_dir: impl Into<PathBuf>) -> Self {
        Self {
            train_dir: train_dir.into(),
            ..Self::default()
        }
    }

    /// Loads a loader configuration from a JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mnist_data::LoaderConfig;
    /// use std::path::Path;
    ///
    /// let config = LoaderConfig::load(Path::new("mnist.json")).unwrap();
    /// ```
    pub fn load(path: &Path) -> Result<Self, MnistError> {
        let config_str = fs::read_to_string(path)?;
        let config: LoaderConfig = serde_json::from_str(&config_str)?;
        Ok(config)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_url: SOURCE_URL.to_string(),
            train_dir: PathBuf::from("MNIST_data"),
            validation_size: VALIDATION_SIZE,
            one_hot: true,
            seed: None,
        }
    }
}

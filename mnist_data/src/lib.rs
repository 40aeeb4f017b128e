//! Fetching, decoding and batching of the MNIST handwritten-digit dataset.

pub mod config;
pub mod data_sets;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod idx;
pub mod one_hot;
pub mod progress;

pub use crate::config::LoaderConfig;
pub use crate::data_sets::{read_data_sets, read_data_sets_with, DataSets};
pub use crate::dataset::{Batch, DataSet, Labels, LabelsView};
pub use crate::error::MnistError;
pub use crate::fetch::{Downloader, Fetcher, HttpDownloader};

//! Assembly of the train, validation and test splits.

use crate::config::LoaderConfig;
use crate::dataset::{DataSet, Labels};
use crate::error::MnistError;
use crate::fetch::{Downloader, Fetcher};
use crate::idx::{extract_images, extract_labels};
use crate::progress::{create_progress_style, DECODE_TEMPLATE};
use indicatif::{MultiProgress, ProgressBar};
use log::info;
use ndarray::{s, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte.gz";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte.gz";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte.gz";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte.gz";

/// The three MNIST splits. No example appears in more than one of them.
#[derive(Debug)]
pub struct DataSets {
    pub train: DataSet<StdRng>,
    pub validation: DataSet<StdRng>,
    pub test: DataSet<StdRng>,
}

impl DataSets {
    /// Fetches and decodes the four archives, then splits them.
    ///
    /// Archives are looked up in `config.train_dir` and downloaded through `fetcher`
    /// when missing. Any fetch or decode error is returned unchanged.
    pub fn read<D: Downloader, G: Rng>(
        config: &LoaderConfig,
        fetcher: &Fetcher<D>,
        rng: &mut G,
    ) -> Result<Self, MnistError> {
        let multi_progress = MultiProgress::new();
        let style = create_progress_style(DECODE_TEMPLATE);
        let bar = || {
            let bar = multi_progress.add(ProgressBar::new(0));
            bar.set_style(style.clone());
            bar
        };

        let dir = &config.train_dir;
        let train_images = extract_images(fetcher.maybe_download(TRAIN_IMAGES, dir)?, &bar())?;
        let train_labels = extract_labels(
            fetcher.maybe_download(TRAIN_LABELS, dir)?,
            config.one_hot,
            &bar(),
        )?;
        let test_images = extract_images(fetcher.maybe_download(TEST_IMAGES, dir)?, &bar())?;
        let test_labels = extract_labels(
            fetcher.maybe_download(TEST_LABELS, dir)?,
            config.one_hot,
            &bar(),
        )?;

        Self::from_arrays(
            train_images,
            train_labels,
            test_images,
            test_labels,
            config.validation_size,
            rng,
        )
    }

    /// Splits decoded arrays into train, validation and test sets.
    ///
    /// The first `validation_size` training examples become the validation set and the
    /// rest the training set. Each set shuffles with its own generator seeded from `rng`.
    ///
    /// # Returns
    /// * `Err(MnistError::InvalidValidationSize)` if `validation_size` exceeds the
    ///   number of training images
    /// * any error from [`DataSet::new`]
    pub fn from_arrays<G: Rng>(
        train_images: Array4<u8>,
        train_labels: Labels,
        test_images: Array4<u8>,
        test_labels: Labels,
        validation_size: usize,
        rng: &mut G,
    ) -> Result<Self, MnistError> {
        let num_train = train_images.len_of(ndarray::Axis(0));
        if validation_size > num_train {
            return Err(MnistError::InvalidValidationSize {
                validation_size,
                num_examples: num_train,
            });
        }
        if num_train != train_labels.len() {
            return Err(MnistError::DataMismatch {
                images: train_images.shape().to_vec(),
                labels: train_labels.shape().to_vec(),
            });
        }

        let validation_images = train_images.slice(s![..validation_size, .., .., ..]).to_owned();
        let validation_labels = train_labels.slice(0..validation_size);
        let train_images = train_images.slice(s![validation_size.., .., .., ..]).to_owned();
        let train_labels = train_labels.slice(validation_size..num_train);

        let data_sets = Self {
            train: DataSet::new(train_images, train_labels, StdRng::from_rng(rng))?,
            test: DataSet::new(test_images, test_labels, StdRng::from_rng(rng))?,
            validation: DataSet::new(
                validation_images,
                validation_labels,
                StdRng::from_rng(rng),
            )?,
        };
        info!(
            "Loaded {} train, {} validation and {} test examples",
            data_sets.train.num_examples(),
            data_sets.validation.num_examples(),
            data_sets.test.num_examples()
        );
        Ok(data_sets)
    }
}

/// Creates the fetcher described by `config`.
pub fn fetcher_for(config: &LoaderConfig) -> Result<Fetcher, MnistError> {
    Fetcher::new(config.source_url.clone())
}

/// Reads the MNIST splits from `train_dir`, downloading missing archives.
///
/// Uses the default source URL and validation size, shuffling with a generator seeded
/// from the operating system.
///
/// # Example
/// ```no_run
/// use mnist_data::read_data_sets;
///
/// let mut mnist = read_data_sets("MNIST_data", true).unwrap();
/// let batch = mnist.train.next_batch(100).unwrap();
/// assert_eq!(batch.images.ncols(), 784);
/// ```
pub fn read_data_sets(train_dir: impl AsRef<Path>, one_hot: bool) -> Result<DataSets, MnistError> {
    let config = LoaderConfig {
        one_hot,
        ..LoaderConfig::new(train_dir.as_ref())
    };
    read_data_sets_with(&config)
}

/// Reads the MNIST splits as described by `config`.
pub fn read_data_sets_with(config: &LoaderConfig) -> Result<DataSets, MnistError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    DataSets::read(config, &fetcher_for(config)?, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LabelsView;
    use ndarray::{Array1, ArrayView1};
    use std::collections::HashSet;

    /// 1x2 images whose two pixels hold the example index in base 256.
    fn provenance_images(count: usize) -> Array4<u8> {
        Array4::from_shape_fn((count, 1, 2, 1), |(i, _, col, _)| {
            if col == 0 {
                (i / 256) as u8
            } else {
                (i % 256) as u8
            }
        })
    }

    fn provenance(row: ArrayView1<'_, f32>) -> usize {
        let high = (row[0] * 255.0).round() as usize;
        let low = (row[1] * 255.0).round() as usize;
        high * 256 + low
    }

    fn origins(data_set: &DataSet<StdRng>) -> HashSet<usize> {
        data_set.images().rows().into_iter().map(provenance).collect()
    }

    fn dense_labels(count: usize) -> Labels {
        Labels::Dense((0..count).map(|i| (i % 10) as u8).collect())
    }

    #[test]
    fn test_validation_split_is_disjoint() {
        let mut rng = StdRng::seed_from_u64(42);
        let data_sets = DataSets::from_arrays(
            provenance_images(5001),
            dense_labels(5001),
            provenance_images(3),
            dense_labels(3),
            5000,
            &mut rng,
        )
        .unwrap();

        assert_eq!(data_sets.validation.num_examples(), 5000);
        assert_eq!(data_sets.train.num_examples(), 1);
        assert_eq!(data_sets.test.num_examples(), 3);

        let validation = origins(&data_sets.validation);
        let train = origins(&data_sets.train);
        assert_eq!(validation, (0..5000).collect::<HashSet<_>>());
        assert_eq!(train, HashSet::from([5000]));
        assert!(validation.is_disjoint(&train));
    }

    #[test]
    fn test_labels_travel_with_their_images() {
        let mut rng = StdRng::seed_from_u64(3);
        let data_sets = DataSets::from_arrays(
            provenance_images(40),
            dense_labels(40),
            provenance_images(10),
            dense_labels(10),
            15,
            &mut rng,
        )
        .unwrap();

        for data_set in [&data_sets.train, &data_sets.validation, &data_sets.test] {
            let LabelsView::Dense(labels) = data_set.labels() else {
                panic!("Expected dense labels");
            };
            for (row, &label) in data_set.images().rows().into_iter().zip(labels.iter()) {
                assert_eq!(provenance(row) % 10, label as usize);
            }
        }
    }

    #[test]
    fn test_validation_larger_than_train() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = DataSets::from_arrays(
            provenance_images(10),
            dense_labels(10),
            provenance_images(1),
            dense_labels(1),
            11,
            &mut rng,
        );

        assert!(matches!(
            result,
            Err(MnistError::InvalidValidationSize {
                validation_size: 11,
                num_examples: 10
            })
        ));
    }

    #[test]
    fn test_train_label_mismatch() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = DataSets::from_arrays(
            provenance_images(10),
            dense_labels(9),
            provenance_images(1),
            dense_labels(1),
            5,
            &mut rng,
        );

        assert!(matches!(result, Err(MnistError::DataMismatch { .. })));
    }

    #[test]
    fn test_test_label_mismatch() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = DataSets::from_arrays(
            provenance_images(10),
            dense_labels(10),
            provenance_images(2),
            Labels::Dense(Array1::zeros(3)),
            5,
            &mut rng,
        );

        assert!(matches!(result, Err(MnistError::DataMismatch { .. })));
    }

    #[test]
    fn test_zero_validation_size() {
        let mut rng = StdRng::seed_from_u64(0);
        let data_sets = DataSets::from_arrays(
            provenance_images(4),
            dense_labels(4),
            provenance_images(2),
            dense_labels(2),
            0,
            &mut rng,
        )
        .unwrap();

        assert_eq!(data_sets.validation.num_examples(), 0);
        assert_eq!(data_sets.train.num_examples(), 4);
    }
}

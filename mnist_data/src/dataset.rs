//! In-memory data set serving shuffled mini-batches.
//!
//! A [`DataSet`] flattens and normalizes an image tensor, pairs it with its labels and
//! hands out consecutive batches. When a batch would run past the end of the data the
//! epoch counter advances, images and labels are reshuffled together and serving restarts
//! from the first row. The rows left over at the end of the old epoch are skipped.

use crate::error::MnistError;
use log::debug;
use ndarray::{s, Array1, Array2, Array4, ArrayView1, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;

/// Class labels, either as raw digit indices or as one-hot rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    Dense(Array1<u8>),
    OneHot(Array2<f32>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Dense(labels) => labels.len(),
            Labels::OneHot(labels) => labels.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Labels::Dense(labels) => labels.shape(),
            Labels::OneHot(labels) => labels.shape(),
        }
    }

    pub fn view(&self) -> LabelsView<'_> {
        match self {
            Labels::Dense(labels) => LabelsView::Dense(labels.view()),
            Labels::OneHot(labels) => LabelsView::OneHot(labels.view()),
        }
    }

    /// Rows `range`, copied into new labels.
    pub(crate) fn slice(&self, range: Range<usize>) -> Labels {
        match self {
            Labels::Dense(labels) => Labels::Dense(labels.slice(s![range]).to_owned()),
            Labels::OneHot(labels) => Labels::OneHot(labels.slice(s![range, ..]).to_owned()),
        }
    }

    /// Rows picked in `indices` order.
    fn select(&self, indices: &[usize]) -> Labels {
        match self {
            Labels::Dense(labels) => Labels::Dense(labels.select(Axis(0), indices)),
            Labels::OneHot(labels) => Labels::OneHot(labels.select(Axis(0), indices)),
        }
    }
}

/// Borrowed rows of [`Labels`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelsView<'a> {
    Dense(ArrayView1<'a, u8>),
    OneHot(ArrayView2<'a, f32>),
}

impl LabelsView<'_> {
    pub fn len(&self) -> usize {
        match self {
            LabelsView::Dense(labels) => labels.len(),
            LabelsView::OneHot(labels) => labels.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            LabelsView::Dense(labels) => labels.shape(),
            LabelsView::OneHot(labels) => labels.shape(),
        }
    }
}

/// One mini-batch of flattened images and their labels.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub images: ArrayView2<'a, f32>,
    pub labels: LabelsView<'a>,
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.images.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized images paired with labels, shuffled by an owned generator.
#[derive(Debug, Clone)]
pub struct DataSet<R> {
    images: Array2<f32>,
    labels: Labels,
    num_examples: usize,
    epochs_completed: usize,
    index_in_epoch: usize,
    rng: R,
}

impl<R: Rng> DataSet<R> {
    /// Creates a data set from a `(count, rows, cols, 1)` image tensor and matching labels.
    ///
    /// Images are flattened to `rows * cols` columns and scaled from `0..=255` to `0.0..=1.0`.
    /// Rows are shuffled once with `rng`, keeping every image next to its label.
    ///
    /// # Returns
    /// * `Err(MnistError::DataMismatch)` if image and label counts differ
    /// * `Err(MnistError::InvalidChannels)` if the images have more than one channel
    pub fn new(images: Array4<u8>, labels: Labels, rng: R) -> Result<Self, MnistError> {
        let (count, rows, cols, channels) = images.dim();
        if count != labels.len() {
            return Err(MnistError::DataMismatch {
                images: images.shape().to_vec(),
                labels: labels.shape().to_vec(),
            });
        }
        if channels != 1 {
            return Err(MnistError::InvalidChannels { channels });
        }

        let images = images
            .into_shape_with_order((count, rows * cols))?
            .mapv(|pixel| f32::from(pixel) / 255.0);

        let mut data_set = Self {
            images,
            labels,
            num_examples: count,
            epochs_completed: 0,
            index_in_epoch: 0,
            rng,
        };
        data_set.shuffle();
        Ok(data_set)
    }

    pub fn images(&self) -> ArrayView2<'_, f32> {
        self.images.view()
    }

    pub fn labels(&self) -> LabelsView<'_> {
        self.labels.view()
    }

    pub fn num_examples(&self) -> usize {
        self.num_examples
    }

    pub fn epochs_completed(&self) -> usize {
        self.epochs_completed
    }

    /// Returns the next `batch_size` examples from this data set.
    ///
    /// Batches are consecutive rows of the current shuffle. If the batch does not fit in
    /// what is left of the epoch, the epoch counter is incremented, the data is reshuffled
    /// and the batch is taken from the start. The unread tail of the finished epoch is
    /// dropped, not carried over: with 10 examples and a batch size of 4 the third call
    /// already starts a new epoch.
    ///
    /// # Returns
    /// * `Err(MnistError::BatchTooLarge)` if `batch_size` exceeds the number of examples
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Batch<'_>, MnistError> {
        if batch_size > self.num_examples {
            return Err(MnistError::BatchTooLarge {
                batch_size,
                num_examples: self.num_examples,
            });
        }

        let mut start = self.index_in_epoch;
        self.index_in_epoch += batch_size;

        if self.index_in_epoch > self.num_examples {
            self.epochs_completed += 1;
            debug!(
                "Epoch {} complete, dropping {} unread examples",
                self.epochs_completed,
                self.num_examples - start
            );
            self.shuffle();

            start = 0;
            self.index_in_epoch = batch_size;
        }

        let end = self.index_in_epoch;
        let labels = match &self.labels {
            Labels::Dense(labels) => LabelsView::Dense(labels.slice(s![start..end])),
            Labels::OneHot(labels) => LabelsView::OneHot(labels.slice(s![start..end, ..])),
        };
        Ok(Batch {
            images: self.images.slice(s![start..end, ..]),
            labels,
        })
    }

    /// Reorders images and labels with one fresh permutation.
    fn shuffle(&mut self) {
        let mut permutation: Vec<usize> = (0..self.num_examples).collect();
        permutation.shuffle(&mut self.rng);

        self.images = self.images.select(Axis(0), &permutation);
        self.labels = self.labels.select(&permutation);
    }
}

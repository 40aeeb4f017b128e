//! Conversion between dense class indices and one-hot label rows.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Number of digit classes in MNIST.
pub const NUM_CLASSES: usize = 10;

/// Converts class labels from scalars to one-hot rows.
///
/// The result has one row per label and `num_classes` columns, with a single
/// `1.0` at the column of the label. Labels outside `0..num_classes` are not
/// validated and leave their row all zeros.
///
/// # Example
/// ```
/// use mnist_data::one_hot::dense_to_one_hot;
/// use ndarray::array;
///
/// let one_hot = dense_to_one_hot(array![2u8, 0].view(), 3);
/// assert_eq!(one_hot, array![[0.0f32, 0.0, 1.0], [1.0, 0.0, 0.0]]);
/// ```
pub fn dense_to_one_hot(labels: ArrayView1<'_, u8>, num_classes: usize) -> Array2<f32> {
    let mut one_hot = Array2::zeros((labels.len(), num_classes));
    for (mut row, &label) in one_hot.axis_iter_mut(Axis(0)).zip(labels.iter()) {
        if let Some(cell) = row.get_mut(usize::from(label)) {
            *cell = 1.0;
        }
    }
    one_hot
}

/// Recovers class indices from one-hot (or probability) rows by taking the argmax of each row.
///
/// Ties resolve to the lowest column; an all-zero row maps to class 0.
pub fn one_hot_to_dense(one_hot: ArrayView2<'_, f32>) -> Array1<u8> {
    one_hot
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (idx, &value)| {
                    if value > best.1 {
                        (idx, value)
                    } else {
                        best
                    }
                })
                .0
        })
        .map(|idx| u8::try_from(idx).unwrap_or(u8::MAX))
        .collect()
}

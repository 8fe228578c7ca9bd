pub mod linalg;

pub use linalg::{lu_factorize, LuDecomposition, LuError};

use faer::Mat;

pub type DenseMatrix = Mat<f64>;

#[cfg(test)]
pub(crate) fn dense_from_rows(rows: &[Vec<f64>]) -> DenseMatrix {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    Mat::from_fn(nrows, ncols, |row, col| rows[row][col])
}

pub fn diagonal_matrix(values: &[f64]) -> DenseMatrix {
    let dimension = values.len();
    Mat::from_fn(dimension, dimension, |row, col| {
        if row == col { values[row] } else { 0.0 }
    })
}

pub fn mat_vec(matrix: &DenseMatrix, vector: &[f64]) -> Vec<f64> {
    debug_assert_eq!(matrix.ncols(), vector.len());
    (0..matrix.nrows())
        .map(|row| {
            (0..matrix.ncols())
                .map(|col| matrix[(row, col)] * vector[col])
                .sum()
        })
        .collect()
}

/// Infinity norm of `lhs - rhs`; `None` when the lengths differ.
pub fn max_abs_difference(lhs: &[f64], rhs: &[f64]) -> Option<f64> {
    if lhs.len() != rhs.len() {
        return None;
    }

    Some(
        lhs.iter()
            .zip(rhs)
            .map(|(lhs, rhs)| (lhs - rhs).abs())
            .fold(0.0, f64::max),
    )
}

#[cfg(test)]
mod tests {
    use super::{dense_from_rows, diagonal_matrix, mat_vec, max_abs_difference};

    #[test]
    fn diagonal_matrix_places_values_on_the_diagonal() {
        let matrix = diagonal_matrix(&[2.0, -3.0, 0.5]);
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix[(1, 1)], -3.0);
        assert_eq!(matrix[(0, 2)], 0.0);
        assert_eq!(mat_vec(&matrix, &[1.0, 1.0, 4.0]), [2.0, -3.0, 2.0]);
    }

    #[test]
    fn mat_vec_matches_hand_computed_product() {
        let matrix = dense_from_rows(&[vec![1.0, 2.0], vec![0.0, -1.0], vec![3.0, 0.5]]);
        assert_eq!(mat_vec(&matrix, &[2.0, 4.0]), [10.0, -4.0, 8.0]);
    }

    #[test]
    fn max_abs_difference_is_infinity_norm() {
        assert_eq!(max_abs_difference(&[1.0, -2.0], &[0.5, 1.0]), Some(3.0));
        assert_eq!(max_abs_difference(&[1.0], &[1.0, 2.0]), None);
        assert_eq!(max_abs_difference(&[], &[]), Some(0.0));
    }
}

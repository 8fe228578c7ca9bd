use super::DenseMatrix;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-15;
const ILL_CONDITIONED_RELATIVE_PIVOT_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LuError {
    #[error("LU factorization requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("LU factorization requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is singular at pivot index {pivot_index}")]
    SingularMatrix { pivot_index: usize },
    #[error("matrix is ill-conditioned at pivot index {pivot_index}")]
    IllConditionedMatrix { pivot_index: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

/// Partial-pivot LU factors of a square real matrix, reusable across solves.
#[derive(Debug, Clone, PartialEq)]
pub struct LuDecomposition {
    lu: DenseMatrix,
    pivots: Vec<usize>,
}

impl LuDecomposition {
    pub fn dimension(&self) -> usize {
        self.lu.nrows()
    }

    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, LuError> {
        let dimension = self.dimension();
        if rhs.len() != dimension {
            return Err(LuError::RhsLengthMismatch {
                expected: dimension,
                actual: rhs.len(),
            });
        }

        let mut forward = vec![0.0; dimension];
        for row in 0..dimension {
            let mut value = rhs[self.pivots[row]];
            for col in 0..row {
                value -= self.lu[(row, col)] * forward[col];
            }
            forward[row] = value;
        }

        let mut solution = vec![0.0; dimension];
        for row in (0..dimension).rev() {
            let mut value = forward[row];
            for col in (row + 1)..dimension {
                value -= self.lu[(row, col)] * solution[col];
            }

            let diagonal = self.lu[(row, row)];
            if diagonal.abs() <= SINGULAR_PIVOT_EPSILON {
                return Err(LuError::SingularMatrix { pivot_index: row });
            }

            solution[row] = value / diagonal;
        }

        Ok(solution)
    }
}

pub fn lu_factorize(matrix: &DenseMatrix) -> Result<LuDecomposition, LuError> {
    let dimension = validate_square_shape(matrix)?;
    let input_norm_infty = matrix_infinity_norm(matrix);
    let mut lu = matrix.clone();
    let mut pivots: Vec<usize> = (0..dimension).collect();

    for pivot_col in 0..dimension {
        let (pivot_row, pivot_magnitude) = select_pivot_row(&lu, pivot_col);
        if pivot_magnitude <= SINGULAR_PIVOT_EPSILON {
            return Err(LuError::SingularMatrix {
                pivot_index: pivot_col,
            });
        }
        if pivot_magnitude <= input_norm_infty * ILL_CONDITIONED_RELATIVE_PIVOT_EPSILON {
            return Err(LuError::IllConditionedMatrix {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            swap_rows(&mut lu, pivot_col, pivot_row);
            pivots.swap(pivot_col, pivot_row);
        }

        let pivot = lu[(pivot_col, pivot_col)];
        for row in (pivot_col + 1)..dimension {
            lu[(row, pivot_col)] /= pivot;
            let multiplier = lu[(row, pivot_col)];
            if multiplier == 0.0 {
                continue;
            }
            for col in (pivot_col + 1)..dimension {
                let updated = lu[(row, col)] - multiplier * lu[(pivot_col, col)];
                lu[(row, col)] = updated;
            }
        }
    }

    Ok(LuDecomposition { lu, pivots })
}

fn validate_square_shape(matrix: &DenseMatrix) -> Result<usize, LuError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if rows != cols {
        return Err(LuError::NonSquareMatrix { rows, cols });
    }

    Ok(rows)
}

fn select_pivot_row(matrix: &DenseMatrix, pivot_col: usize) -> (usize, f64) {
    let mut best_row = pivot_col;
    let mut best_magnitude = matrix[(pivot_col, pivot_col)].abs();

    for row in (pivot_col + 1)..matrix.nrows() {
        let magnitude = matrix[(row, pivot_col)].abs();
        if magnitude > best_magnitude {
            best_magnitude = magnitude;
            best_row = row;
        }
    }

    (best_row, best_magnitude)
}

fn swap_rows(matrix: &mut DenseMatrix, lhs: usize, rhs: usize) {
    for col in 0..matrix.ncols() {
        let value = matrix[(lhs, col)];
        matrix[(lhs, col)] = matrix[(rhs, col)];
        matrix[(rhs, col)] = value;
    }
}

fn matrix_infinity_norm(matrix: &DenseMatrix) -> f64 {
    let mut best_row_sum: f64 = 0.0;
    for row in 0..matrix.nrows() {
        let mut row_sum = 0.0;
        for col in 0..matrix.ncols() {
            row_sum += matrix[(row, col)].abs();
        }
        best_row_sum = best_row_sum.max(row_sum);
    }
    best_row_sum
}

#[cfg(test)]
mod tests {
    use super::{lu_factorize, LuError};
    use crate::numerics::{dense_from_rows, mat_vec, DenseMatrix};

    #[test]
    fn factorize_and_solve_recover_known_solution_with_pivoting() {
        let matrix = dense_from_rows(&[
            vec![0.0, 2.0, 1.0],
            vec![1.0, -2.0, -3.0],
            vec![-1.0, 1.0, 2.0],
        ]);
        let expected = [1.5, -0.25, 2.0];
        let rhs = mat_vec(&matrix, &expected);

        let actual = lu_factorize(&matrix)
            .expect("decomposition")
            .solve(&rhs)
            .expect("solve");
        for (lhs, rhs) in expected.iter().zip(&actual) {
            assert!((lhs - rhs).abs() < 1.0e-12, "{lhs} vs {rhs}");
        }
    }

    #[test]
    fn factorization_is_reusable_across_right_hand_sides() {
        let matrix = dense_from_rows(&[vec![4.0, 0.0], vec![0.0, -0.5]]);
        let decomposition = lu_factorize(&matrix).expect("decomposition");

        assert_eq!(decomposition.solve(&[2.0, 1.0]).expect("first"), [0.5, -2.0]);
        assert_eq!(decomposition.solve(&[0.0, 0.0]).expect("second"), [0.0, 0.0]);
    }

    #[test]
    fn rejects_empty_and_non_square_matrices() {
        assert_eq!(
            lu_factorize(&DenseMatrix::zeros(0, 0)).expect_err("empty"),
            LuError::EmptyMatrix
        );
        assert_eq!(
            lu_factorize(&DenseMatrix::zeros(2, 3)).expect_err("non-square"),
            LuError::NonSquareMatrix { rows: 2, cols: 3 }
        );
    }

    #[test]
    fn rejects_singular_and_ill_conditioned_matrices() {
        let singular = dense_from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert_eq!(
            lu_factorize(&singular).expect_err("singular"),
            LuError::SingularMatrix { pivot_index: 1 }
        );

        let ill = dense_from_rows(&[vec![1.0e3, 0.0], vec![0.0, 1.0e-11]]);
        assert_eq!(
            lu_factorize(&ill).expect_err("ill-conditioned"),
            LuError::IllConditionedMatrix { pivot_index: 1 }
        );
    }

    #[test]
    fn solve_validates_rhs_dimension() {
        let matrix = dense_from_rows(&[vec![3.0, 1.0], vec![1.0, 2.0]]);
        let error = lu_factorize(&matrix)
            .expect("decomposition")
            .solve(&[1.0])
            .expect_err("rhs mismatch should fail");
        assert_eq!(
            error,
            LuError::RhsLengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}

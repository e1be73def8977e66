//! Dense row-major matrix used for transform coefficients and decibel maps.

use core::ops::{Index, IndexMut};

use crate::error::{Error, Result};

/// Rectangular `rows x cols` matrix stored row-major.
///
/// Rows are frequency (or scale) bins and columns are time positions
/// throughout the crate.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    /// Wrap `data` as a `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let expected = rows.saturating_mul(cols);
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                what: "matrix data",
                expected,
                got: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from a list of equally long rows.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::DimensionMismatch {
                    what: "matrix row",
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols,
            data,
        })
    }

    /// Build from columns (one `Vec` per time position), transposing into row-major order.
    pub fn from_columns(columns: Vec<Vec<T>>) -> Result<Self>
    where
        T: Clone,
    {
        let rows = columns.first().map_or(0, Vec::len);
        let cols = columns.len();
        for col in &columns {
            if col.len() != rows {
                return Err(Error::DimensionMismatch {
                    what: "matrix column",
                    expected: rows,
                    got: col.len(),
                });
            }
        }
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            data.extend(columns.iter().map(|c| c[r].clone()));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Iterate over rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics, and an empty matrix has nothing to yield anyway
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element-wise conversion preserving shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Matrix<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &mut self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_transpose_into_rows() {
        let m = Matrix::from_columns(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.row(0), &[1, 4]);
        assert_eq!(m[(2, 1)], 6);
        assert_eq!(m.iter_rows().count(), 3);
    }

    #[test]
    fn ragged_input_is_rejected() {
        assert!(matches!(
            Matrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            Matrix::new(2, 2, vec![0u8; 3]),
            Err(Error::DimensionMismatch { expected: 4, got: 3, .. })
        ));
    }

    #[test]
    fn map_keeps_shape() {
        let m = Matrix::filled(2, 3, 2.0f64);
        let doubled = m.map(|v| v * 2.0);
        assert_eq!(doubled.shape(), (2, 3));
        assert!(doubled.as_slice().iter().all(|&v| v == 4.0));
        assert_eq!(m.get(5, 0), None);
    }
}

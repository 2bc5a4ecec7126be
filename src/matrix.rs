//! Matrix builder — lays a [`Spec`] out as a dense least-squares problem.

use crate::spec::Spec;

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row slices. `None` if the rows differ in length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        let mut m = Self::zeros(rows.len(), cols);
        for (r, row) in rows.iter().enumerate() {
            m.data[r * cols..(r + 1) * cols].copy_from_slice(row);
        }
        Some(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    /// `A · x`
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.cols);
        (0..self.rows)
            .map(|r| (0..self.cols).map(|c| self.get(r, c) * x[c]).sum())
            .collect()
    }

    /// `Aᵗ · y`
    pub fn transpose_mul_vec(&self, y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(y.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for (r, &yr) in y.iter().enumerate() {
            if yr == 0.0 {
                continue;
            }
            for (c, o) in out.iter_mut().enumerate() {
                *o += self.get(r, c) * yr;
            }
        }
        out
    }

    /// `Aᵗ · A`, a `cols × cols` symmetric matrix.
    pub fn gram(&self) -> Matrix {
        let mut g = Matrix::zeros(self.cols, self.cols);
        for i in 0..self.cols {
            for j in i..self.cols {
                let dot: f64 = (0..self.rows).map(|r| self.get(r, i) * self.get(r, j)).sum();
                g.set(i, j, dot);
                g.set(j, i, dot);
            }
        }
        g
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Solve `self · x = rhs` for a square matrix using Gauss-Jordan
    /// elimination with partial pivoting.
    ///
    /// Returns `None` when a pivot falls below `1e-12` of the largest entry,
    /// i.e. the matrix is singular to working precision.
    pub fn solve(&self, rhs: &[f64]) -> Option<Vec<f64>> {
        let n = self.rows;
        debug_assert_eq!(self.cols, n);
        debug_assert_eq!(rhs.len(), n);

        let mut a = self.data.clone();
        let mut x = rhs.to_vec();
        let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let eps = scale * 1e-12;

        for col in 0..n {
            // Find pivot
            let pivot_row = (col..n).max_by(|&i, &j| {
                a[i * n + col].abs().total_cmp(&a[j * n + col].abs())
            })?;
            if pivot_row != col {
                for j in 0..n {
                    a.swap(col * n + j, pivot_row * n + j);
                }
                x.swap(col, pivot_row);
            }

            let pivot = a[col * n + col];
            if pivot.abs() <= eps {
                return None;
            }
            for j in col..n {
                a[col * n + j] /= pivot;
            }
            x[col] /= pivot;

            // Eliminate column
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in col..n {
                    a[row * n + j] -= factor * a[col * n + j];
                }
                x[row] -= factor * x[col];
            }
        }

        Some(x)
    }
}

/// Euclidean norm of a vector.
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// The numeric problem handed to the solver.
///
/// Rows are components, columns are signals.
#[derive(Debug, Clone, PartialEq)]
pub struct MixProblem {
    pub contributions: Matrix,
    pub target: Vec<f64>,
    /// 1.0 for hall-derived signals, 0.0 otherwise.
    pub hall: Vec<f64>,
    pub signal_names: Vec<String>,
    pub component_names: Vec<String>,
}

impl MixProblem {
    pub fn build(spec: &Spec) -> Self {
        let n_components = spec.components.len();
        let n_signals = spec.signals.len();

        let mut contributions = Matrix::zeros(n_components, n_signals);
        let mut hall = vec![0.0; n_signals];
        let mut signal_names = Vec::with_capacity(n_signals);

        for (s, signal) in spec.signals.iter().enumerate() {
            signal_names.push(signal.name.clone());
            if signal.is_hall {
                hall[s] = 1.0;
            }
            for (&id, &weight) in &signal.weights {
                contributions.set(id.0, s, weight);
            }
        }

        let mut target = vec![0.0; n_components];
        for (id, weight) in spec.target.iter() {
            target[id.0] = weight;
        }

        Self {
            contributions,
            target,
            hall,
            signal_names,
            component_names: spec.components.names().to_vec(),
        }
    }

    pub fn signal_count(&self) -> usize {
        self.contributions.cols()
    }

    pub fn component_count(&self) -> usize {
        self.contributions.rows()
    }
}

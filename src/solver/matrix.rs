//! Nodal matrix assembly and solving.

use crate::error::{CosimError, Result};

/// Nodal matrix system Ax = z.
///
/// Rows 0..num_nodes-1 are node voltage equations (ground excluded), the
/// remaining rows are clock branch current equations. Bridges hold row
/// indices into this system for the life of a run; the dimension is fixed
/// at construction.
#[derive(Debug)]
pub struct NodalMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A (for efficient solving)
    pub lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pub pivots: Vec<usize>,
}

impl NodalMatrix {
    /// Create a new matrix of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and source vector to zero. The solution vector is
    /// kept: bridges read it as the previous iteration's voltages.
    pub fn clear(&mut self) {
        self.a.fill(0.0);
        self.z.fill(0.0);
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to the right-hand-side element at row.
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a voltage source between two nodes with branch current at row br.
    /// V[n+] - V[n-] = E
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: f64,
    ) {
        // KVL equation: V[n+] - V[n-] = E
        if let Some(i) = n_pos {
            self.add(br, i, 1.0);
            self.add(i, br, 1.0);
        }
        if let Some(j) = n_neg {
            self.add(br, j, -1.0);
            self.add(j, br, -1.0);
        }
        self.z[br] = voltage;
    }

    /// Factor A into LU form, in place in the `lu` buffer.
    ///
    /// Uses partial pivoting by largest column magnitude; the elimination
    /// multipliers are stored below the diagonal, so one buffer holds both
    /// triangles. A pivot column whose remaining entries are all
    /// (numerically) zero means a floating or un-stamped node, reported as
    /// [`CosimError::SingularMatrix`].
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..n {
            // Largest magnitude in column k, at or below the diagonal.
            let mut best = self.lu[k * n + k].abs();
            let mut best_row = k;
            for i in (k + 1)..n {
                let magnitude = self.lu[i * n + k].abs();
                if magnitude > best {
                    best = magnitude;
                    best_row = i;
                }
            }
            if best < 1e-15 {
                return Err(CosimError::SingularMatrix);
            }

            if best_row != k {
                self.pivots.swap(k, best_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, best_row * n + j);
                }
            }

            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let multiplier = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = multiplier;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= multiplier * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve Ax = z into `x` using the factorization from [`factor`].
    ///
    /// [`factor`]: NodalMatrix::factor
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Permute z the way the pivoting permuted the rows of A.
        let rhs = self.z.clone();
        for (i, &p) in self.pivots.iter().enumerate() {
            self.x[i] = rhs[p];
        }

        // Forward pass through L (unit diagonal, multipliers below it).
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Backward pass through U.
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            let diagonal = self.lu[i * n + i];
            if diagonal.abs() < 1e-15 {
                return Err(CosimError::SingularMatrix);
            }
            self.x[i] /= diagonal;
        }

        Ok(())
    }

    /// Get the solved voltage at a node row (None is ground).
    pub fn voltage(&self, node: Option<usize>) -> f64 {
        match node {
            Some(i) => self.x[i],
            None => 0.0, // Ground
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_voltage_divider() {
        // 5 V source into two equal conductances to ground: node 1 sits at 2.5 V.
        // Rows: 0 = top node, 1 = divider node, 2 = source branch.
        let mut m = NodalMatrix::new(3);
        m.stamp_voltage_source(Some(0), None, 2, 5.0);
        m.stamp_conductance(Some(0), Some(1), 1e-3);
        m.stamp_conductance(Some(1), None, 1e-3);

        m.factor().unwrap();
        m.solve().unwrap();

        assert_relative_eq!(m.voltage(Some(0)), 5.0, epsilon = 1e-9);
        assert_relative_eq!(m.voltage(Some(1)), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_matrix_detected() {
        // A floating node has an all-zero row.
        let mut m = NodalMatrix::new(2);
        m.stamp_conductance(Some(0), None, 1e-3);
        assert!(matches!(m.factor(), Err(CosimError::SingularMatrix)));
    }

    #[test]
    fn test_forced_level_overwhelms_weak_path() {
        // Big-conductance forcing on a node that also has a weak 1 mS path
        // to ground converges the node to the target level.
        let mut m = NodalMatrix::new(1);
        m.stamp_conductance(Some(0), None, 1e-3);
        m.add(0, 0, 1e6);
        m.add_rhs(0, 1e6 * 5.0);

        m.factor().unwrap();
        m.solve().unwrap();
        assert_relative_eq!(m.voltage(Some(0)), 5.0, epsilon = 1e-4);
    }
}

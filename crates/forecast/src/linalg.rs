//! Penalised least squares.

/// Solve `(X'X + diag(penalty)) beta = X'y`.
///
/// `rows` are the design-matrix rows; `penalty` has one entry per column.
/// Returns `None` when the system is not positive definite.
pub(crate) fn ridge_solve(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> Option<Vec<f64>> {
    let k = penalty.len();
    if k == 0 || rows.len() != y.len() {
        return None;
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for (row, &y_obs) in rows.iter().zip(y) {
        if row.len() != k {
            return None;
        }
        for i in 0..k {
            let xi = row[i];
            if xi == 0.0 {
                continue;
            }
            xty[i] += xi * y_obs;
            for j in 0..=i {
                xtx[i][j] += xi * row[j];
            }
        }
    }

    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        // Jitter keeps unpenalised columns solvable on degenerate inputs.
        xtx[i][i] += penalty[i] + 1e-8;
    }

    cholesky_solve(&xtx, &xty)
}

/// Solve a symmetric positive definite system `A x = b` via `A = L L'`.
fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * z[j];
        }
        z[i] = sum / l[i][i];
    }

    // L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_fit() {
        // y = 2 + 3x
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 + 3.0 * i as f64).collect();

        let beta = ridge_solve(&rows, &y, &[0.0, 0.0]).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-6);
        assert!((beta[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn penalty_shrinks_coefficients() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();

        let free = ridge_solve(&rows, &y, &[0.0, 0.0]).unwrap();
        let shrunk = ridge_solve(&rows, &y, &[0.0, 1_000.0]).unwrap();
        assert!(shrunk[1].abs() < free[1].abs());
    }

    #[test]
    fn penalty_makes_wide_systems_solvable() {
        // More columns than rows.
        let rows = vec![vec![1.0, 0.5, 0.25, 0.1], vec![1.0, 0.6, 0.36, 0.2]];
        let y = vec![1.0, 2.0];
        assert!(ridge_solve(&rows, &y, &[0.0, 0.1, 0.1, 0.1]).is_some());
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let rows = vec![vec![1.0, 2.0]];
        assert!(ridge_solve(&rows, &[1.0, 2.0], &[0.0, 0.0]).is_none());
        assert!(ridge_solve(&rows, &[1.0], &[0.0]).is_none());
    }
}

use crate::domain::model::{Dataset, Label};
use crate::utils::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegressionParams {
    /// Inverse of the L2 regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// Binary logistic regression with an L2 penalty on the weights (not the intercept).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub c: f64,
    pub n_iter: usize,
    pub converged: bool,
    pub trained_at: DateTime<Utc>,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z))` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

impl LogisticRegression {
    /// Newton (IRLS) fit of `C * sum(logloss) + 0.5 * ||w||^2`.
    ///
    /// Stops once the largest parameter update falls below `tol`; hitting
    /// `max_iter` first leaves `converged = false`.
    pub fn fit(data: &Dataset, params: &LogisticRegressionParams) -> Result<Self> {
        if data.is_empty() {
            return Err(PipelineError::validation("cannot train on zero rows"));
        }
        let classes = data.labels.iter().filter(|&&l| l == Label::Stressed).count();
        if classes == 0 || classes == data.len() {
            return Err(PipelineError::validation(
                "training data needs samples of both classes",
            ));
        }

        let d = data.n_features();
        if let Some(row) = data.rows.iter().find(|r| r.len() != d) {
            return Err(PipelineError::validation(format!(
                "row has {} values, expected {}",
                row.len(),
                d
            )));
        }

        let y: Vec<f64> = data.labels.iter().map(|l| l.as_i64() as f64).collect();
        // θ = [w_0 .. w_{d-1}, b]
        let mut theta = vec![0.0; d + 1];
        let mut objective = Self::objective(&data.rows, &y, &theta, params.c);
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < params.max_iter {
            n_iter += 1;

            let (gradient, hessian) = Self::gradient_and_hessian(&data.rows, &y, &theta, params.c);
            let step = solve(hessian, gradient).ok_or_else(|| {
                PipelineError::processing("Hessian is singular; features may be degenerate")
            })?;

            // 回溯線搜尋，確保目標函數下降
            let mut t = 1.0;
            let mut candidate: Vec<f64>;
            let mut candidate_objective;
            loop {
                candidate = theta.iter().zip(&step).map(|(p, s)| p - t * s).collect();
                candidate_objective = Self::objective(&data.rows, &y, &candidate, params.c);
                if candidate_objective <= objective + 1e-12 || t < 1e-8 {
                    break;
                }
                t *= 0.5;
            }

            let max_update = step.iter().fold(0.0f64, |acc, s| acc.max((t * s).abs()));
            theta = candidate;
            objective = candidate_objective;

            if max_update < params.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                "⚠️ Logistic regression did not converge within {} iterations",
                params.max_iter
            );
        }

        let intercept = theta[d];
        theta.truncate(d);

        Ok(Self {
            feature_names: data.feature_names.clone(),
            coefficients: theta,
            intercept,
            c: params.c,
            n_iter,
            converged,
            trained_at: Utc::now(),
        })
    }

    fn linear(row: &[f64], theta: &[f64]) -> f64 {
        let d = row.len();
        row.iter().zip(&theta[..d]).map(|(x, w)| x * w).sum::<f64>() + theta[d]
    }

    fn objective(rows: &[Vec<f64>], y: &[f64], theta: &[f64], c: f64) -> f64 {
        let d = theta.len() - 1;
        let loss: f64 = rows
            .iter()
            .zip(y)
            .map(|(row, &yi)| {
                let z = Self::linear(row, theta);
                softplus(z) - yi * z
            })
            .sum();
        let penalty: f64 = theta[..d].iter().map(|w| w * w).sum::<f64>() * 0.5;
        c * loss + penalty
    }

    fn gradient_and_hessian(
        rows: &[Vec<f64>],
        y: &[f64],
        theta: &[f64],
        c: f64,
    ) -> (Vec<f64>, Vec<Vec<f64>>) {
        let p = theta.len();
        let d = p - 1;
        let mut gradient = vec![0.0; p];
        let mut hessian = vec![vec![0.0; p]; p];

        for (row, &yi) in rows.iter().zip(y) {
            let prob = sigmoid(Self::linear(row, theta));
            let residual = c * (prob - yi);
            let weight = c * prob * (1.0 - prob);

            for j in 0..p {
                let xj = if j < d { row[j] } else { 1.0 };
                gradient[j] += residual * xj;
                for k in j..p {
                    let xk = if k < d { row[k] } else { 1.0 };
                    hessian[j][k] += weight * xj * xk;
                }
            }
        }

        for j in 0..p {
            for k in 0..j {
                hessian[j][k] = hessian[k][j];
            }
        }
        for j in 0..d {
            gradient[j] += theta[j];
            hessian[j][j] += 1.0;
        }
        // 截距不受正則化；加上極小值避免完全飽和時矩陣奇異
        hessian[d][d] += 1e-10;

        (gradient, hessian)
    }

    pub fn decision_function(&self, row: &[f64]) -> f64 {
        row.iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept
    }

    /// Probability of the stressed class.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }

    /// Stressed when the decision value is strictly positive.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<Label> {
        rows.iter()
            .map(|row| {
                if self.decision_function(row) > 0.0 {
                    Label::Stressed
                } else {
                    Label::Neutral
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Gaussian elimination with partial pivoting. `None` if `a` is singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-14 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

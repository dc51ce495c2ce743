use crate::utils::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Per-column standardisation: `(x - mean) / std`, population std (ddof 0).
///
/// Constant columns keep a scale of 1 so they map to 0 instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub var: Vec<f64>,
    pub scale: Vec<f64>,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(feature_names: &[String], rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::validation("cannot fit a scaler on zero rows"));
        }
        let width = feature_names.len();
        check_width(rows, width)?;

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        for v in var.iter_mut() {
            *v /= n;
        }

        let scale = var
            .iter()
            .zip(&mean)
            .map(|(&v, &m)| {
                let std = v.sqrt();
                // 浮點誤差造成的極小標準差視為常數欄
                if !std.is_finite() || std <= 10.0 * f64::EPSILON * m.abs().max(1.0) {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self {
            feature_names: feature_names.to_vec(),
            mean,
            var,
            scale,
            n_samples_seen: rows.len(),
        })
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_width(rows, self.mean.len())?;
        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect())
    }

    pub fn fit_transform(feature_names: &[String], rows: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>)> {
        let scaler = Self::fit(feature_names, rows)?;
        let scaled = scaler.transform(rows)?;
        Ok((scaler, scaled))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

fn check_width(rows: &[Vec<f64>], width: usize) -> Result<()> {
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(PipelineError::validation(format!(
            "row {} has {} values, expected {}",
            i,
            row.len(),
            width
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_fit_transform_standardises_columns() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0], vec![4.0, 40.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&names(2), &rows).unwrap();

        assert_eq!(scaler.mean, vec![2.5, 25.0]);
        assert!((scaler.var[0] - 1.25).abs() < 1e-12);
        assert_eq!(scaler.n_samples_seen, 4);

        for col in 0..2 {
            let values: Vec<f64> = scaled.iter().map(|r| r[col]).collect();
            let mean = values.iter().sum::<f64>() / 4.0;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let rows = vec![vec![0.1, 1.0], vec![0.1, 2.0], vec![0.1, 3.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&names(2), &rows).unwrap();

        assert_eq!(scaler.scale[0], 1.0);
        assert!(scaled.iter().all(|r| r[0].abs() < 1e-12));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(StandardScaler::fit(&names(2), &rows).is_err());
        assert!(StandardScaler::fit(&names(2), &[]).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let rows = vec![vec![1.0], vec![3.0]];
        let scaler = StandardScaler::fit(&names(1), &rows).unwrap();
        let json = scaler.to_json().unwrap();
        let restored = StandardScaler::from_json(json.as_bytes()).unwrap();
        assert_eq!(restored, scaler);
    }
}

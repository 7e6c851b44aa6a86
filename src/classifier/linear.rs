use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{
    classifier::{BanknoteModel, FEATURE_COUNT, check_row_width},
    error::{BanknoteError, Result},
};

/// Per-feature standardization applied before the linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

fn default_classes() -> [i64; 2] {
    [0, 1]
}

/// Binary logistic regression: `p(classes[1]) = sigmoid(w . x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = Self {
            coefficients,
            intercept,
            scaler: None,
            classes: default_classes(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_scaler(mut self, scaler: StandardScaler) -> Result<Self> {
        self.scaler = Some(scaler);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(BanknoteError::ModelLoad(format!(
                "logistic regression expects {} coefficients, found {}",
                FEATURE_COUNT,
                self.coefficients.len()
            )));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != FEATURE_COUNT || scaler.scale.len() != FEATURE_COUNT {
                return Err(BanknoteError::ModelLoad(
                    "scaler mean/scale must have one entry per feature".into(),
                ));
            }
            if scaler.scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
                return Err(BanknoteError::ModelLoad(
                    "scaler scale entries must be finite and non-zero".into(),
                ));
            }
        }

        let finite = self.coefficients.iter().all(|c| c.is_finite()) && self.intercept.is_finite();
        if !finite {
            return Err(BanknoteError::ModelLoad(
                "logistic regression weights must be finite".into(),
            ));
        }

        Ok(())
    }

    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut z = self.intercept;

        for (i, (&x, &w)) in row.iter().zip(&self.coefficients).enumerate() {
            let x = match &self.scaler {
                Some(scaler) => (x - scaler.mean[i]) / scaler.scale[i],
                None => x,
            };
            z += w * x;
        }

        z
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl BanknoteModel for LogisticRegression {
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<i64>> {
        check_row_width(&rows)?;

        Ok(rows
            .rows()
            .into_iter()
            .map(|row| {
                if self.decision_function(row) > 0.0 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            })
            .collect())
    }

    fn predict_proba(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        check_row_width(&rows)?;

        let mut proba = Array2::zeros((rows.nrows(), 2));
        for (i, row) in rows.rows().into_iter().enumerate() {
            let p = sigmoid(self.decision_function(row));
            proba[[i, 0]] = 1.0 - p;
            proba[[i, 1]] = p;
        }

        Ok(proba)
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_predict_follows_decision_sign() {
        let model = LogisticRegression::new(vec![1.0, 0.0, 0.0, 0.0], -2.0).unwrap();
        let rows = array![[3.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]];

        let labels = model.predict(rows.view()).unwrap();

        assert_eq!(labels.to_vec(), vec![1, 0]);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let model = LogisticRegression::new(vec![0.5, -1.0, 0.25, 2.0], 0.1).unwrap();
        let rows = array![[0.2, 1.5, -3.0, 4.0]];

        let proba = model.predict_proba(rows.view()).unwrap();

        assert_eq!(proba.dim(), (1, 2));
        assert!((proba.row(0).sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_decision_is_even() {
        let model = LogisticRegression::new(vec![0.0; 4], 0.0).unwrap();

        let proba = model.predict_proba(array![[1.0, 2.0, 3.0, 4.0]].view()).unwrap();

        assert_eq!(proba.row(0).to_vec(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_scaler_is_applied() {
        let model = LogisticRegression::new(vec![1.0, 0.0, 0.0, 0.0], 0.0)
            .unwrap()
            .with_scaler(StandardScaler {
                mean: vec![10.0, 0.0, 0.0, 0.0],
                scale: vec![2.0, 1.0, 1.0, 1.0],
            })
            .unwrap();

        let z = model.decision_function(array![14.0, 0.0, 0.0, 0.0].view());

        assert!((z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_coefficient_count_rejected() {
        assert!(matches!(
            LogisticRegression::new(vec![1.0, 2.0], 0.0),
            Err(BanknoteError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_sigmoid_is_stable_for_large_inputs() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
    }
}

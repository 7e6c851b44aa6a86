use std::{path::Path, sync::Arc};

use log::{error, info};
use ndarray::Array2;

use crate::{
    FeatureVector, Prediction, Verdict,
    classifier::{BanknoteModel, FEATURE_COUNT, artifact::load_model},
    error::{BanknoteError, Result},
};

/// Shared handle over the loaded model, or the reason loading failed.
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: std::result::Result<Arc<dyn BanknoteModel>, String>,
}

impl ClassifierAdapter {
    /// Loads the model once. A failure is logged and recorded; it never
    /// propagates from here.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match load_model(path) {
            Ok(model) => {
                info!("Loaded {} model from {}", model.name(), path.display());
                Self { model: Ok(model) }
            }
            Err(e) => {
                error!("Error loading model from {}: {}", path.display(), e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn from_model(model: Arc<dyn BanknoteModel>) -> Self {
        Self { model: Ok(model) }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            model: Err(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_ok()
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.model.as_ref().err().map(String::as_str)
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction> {
        let model = self
            .model
            .as_ref()
            .map_err(|reason| BanknoteError::ModelUnavailable(reason.clone()))?;

        let row = Array2::from_shape_vec((1, FEATURE_COUNT), features.to_array().to_vec())
            .map_err(|e| BanknoteError::InvalidParameter(e.to_string()))?;

        let labels = model.predict(row.view())?;
        let proba = model.predict_proba(row.view())?;

        let label = *labels.first().ok_or_else(|| {
            BanknoteError::ModelOutput(format!("{} returned no label", model.name()))
        })?;

        if proba.nrows() == 0 || proba.ncols() == 0 {
            return Err(BanknoteError::ModelOutput(format!(
                "{} returned an empty probability distribution",
                model.name()
            )));
        }

        let distribution = proba.row(0);
        if let Some(bad) = distribution
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(BanknoteError::ModelOutput(format!(
                "{} returned probability {} outside [0, 1]",
                model.name(),
                bad
            )));
        }

        let max_probability = distribution.iter().cloned().fold(0.0f64, f64::max);

        Ok(Prediction {
            verdict: Verdict::from_label(label),
            label,
            confidence: max_probability * 100.0,
        })
    }
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.model {
            Ok(model) => f
                .debug_struct("ClassifierAdapter")
                .field("model", &model.name())
                .finish(),
            Err(reason) => f
                .debug_struct("ClassifierAdapter")
                .field("unavailable", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, ArrayView2};

    use super::*;
    use crate::classifier::linear::LogisticRegression;

    /// Returns a fixed label and distribution for every row.
    struct FixedModel {
        label: i64,
        proba: Vec<f64>,
    }

    impl BanknoteModel for FixedModel {
        fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<i64>> {
            assert_eq!(rows.dim(), (1, FEATURE_COUNT));
            Ok(Array1::from_elem(rows.nrows(), self.label))
        }

        fn predict_proba(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            let mut out = Array2::zeros((rows.nrows(), self.proba.len()));
            for mut row in out.rows_mut() {
                row.assign(&Array1::from_vec(self.proba.clone()));
            }
            Ok(out)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn adapter(label: i64, proba: Vec<f64>) -> ClassifierAdapter {
        ClassifierAdapter::from_model(Arc::new(FixedModel { label, proba }))
    }

    fn features() -> FeatureVector {
        FeatureVector {
            variance: 0.02,
            skewness: 1.4,
            kurtosis: 2.2,
            entropy: 15.1,
        }
    }

    #[test]
    fn test_label_one_is_fake() {
        let prediction = adapter(1, vec![0.2, 0.8]).classify(&features()).unwrap();

        assert_eq!(prediction.verdict, Verdict::Fake);
        assert!((prediction.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_zero_is_real() {
        let prediction = adapter(0, vec![0.9, 0.1]).classify(&features()).unwrap();

        assert_eq!(prediction.verdict, Verdict::Real);
        assert!((prediction.confidence - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_other_labels_are_real() {
        let prediction = adapter(7, vec![0.5, 0.5]).classify(&features()).unwrap();

        assert_eq!(prediction.verdict, Verdict::Real);
        assert_eq!(prediction.label, 7);
    }

    #[test]
    fn test_confidence_uses_maximum_even_against_label() {
        let prediction = adapter(1, vec![0.7, 0.3]).classify(&features()).unwrap();

        assert_eq!(prediction.verdict, Verdict::Fake);
        assert!((prediction.confidence - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        assert!(matches!(
            adapter(0, vec![1.5, -0.5]).classify(&features()),
            Err(BanknoteError::ModelOutput(_))
        ));
        assert!(matches!(
            adapter(0, vec![f64::NAN, 0.5]).classify(&features()),
            Err(BanknoteError::ModelOutput(_))
        ));
        assert!(matches!(
            adapter(0, vec![]).classify(&features()),
            Err(BanknoteError::ModelOutput(_))
        ));
    }

    #[test]
    fn test_unavailable_fails_every_call() {
        let adapter = ClassifierAdapter::unavailable("no such file");

        for _ in 0..3 {
            match adapter.classify(&features()) {
                Err(BanknoteError::ModelUnavailable(reason)) => assert_eq!(reason, "no such file"),
                other => panic!("expected ModelUnavailable, got {:?}", other),
            }
        }
        assert!(!adapter.is_available());
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let adapter = ClassifierAdapter::load("/nonexistent/banknote/model.json");

        assert!(!adapter.is_available());
        assert!(adapter.unavailable_reason().is_some());
        assert!(matches!(
            adapter.classify(&features()),
            Err(BanknoteError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_feature_order_reaches_model() {
        let model = LogisticRegression::new(vec![0.0, 0.0, 0.0, 1.0], -15.0).unwrap();
        let adapter = ClassifierAdapter::from_model(Arc::new(model));

        // Only entropy is weighted: 15.1 - 15.0 > 0.
        let prediction = adapter.classify(&features()).unwrap();

        assert_eq!(prediction.verdict, Verdict::Fake);
        assert!(prediction.confidence > 50.0 && prediction.confidence <= 100.0);
    }
}

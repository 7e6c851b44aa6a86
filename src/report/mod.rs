use serde::Serialize;

use crate::{FeatureVector, InspectionReport, error::BanknoteError};

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub path: Option<String>,
    pub status: String,
    pub verdict: Option<String>,
    pub confidence: Option<f64>,
    pub model_loaded: bool,
    pub features: FeatureReportSection,
    pub edges: Option<EdgeReportSection>,
}

#[derive(Debug, Serialize)]
pub struct FeatureReportSection {
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub entropy: f64,
}

#[derive(Debug, Serialize)]
pub struct EdgeReportSection {
    pub width: u32,
    pub height: u32,
    pub max_magnitude: f64,
}

/// Entry for an image that never produced a report (unreadable, undecodable).
#[derive(Debug, Serialize)]
pub struct FailedReport {
    pub path: String,
    pub status: String,
}

impl From<&FeatureVector> for FeatureReportSection {
    fn from(features: &FeatureVector) -> Self {
        Self {
            variance: features.variance,
            skewness: features.skewness,
            kurtosis: features.kurtosis,
            entropy: features.entropy,
        }
    }
}

impl From<&InspectionReport> for JsonReport {
    fn from(report: &InspectionReport) -> Self {
        let prediction = report.prediction.as_ref().ok();

        Self {
            path: report.path.clone(),
            status: report.status(),
            verdict: prediction.map(|p| p.verdict.to_string()),
            confidence: prediction.map(|p| p.confidence),
            model_loaded: !matches!(report.prediction, Err(BanknoteError::ModelUnavailable(_))),
            features: FeatureReportSection::from(&report.features),
            edges: report.edges.as_ref().map(|e| EdgeReportSection {
                width: e.image.width(),
                height: e.image.height(),
                max_magnitude: e.max_magnitude,
            }),
        }
    }
}

impl JsonReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl FailedReport {
    pub fn new(path: impl Into<String>, error: &BanknoteError) -> Self {
        Self {
            path: path.into(),
            status: format!("Error: {}", error),
        }
    }
}

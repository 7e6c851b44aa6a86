use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};

use image::{DynamicImage, GrayImage};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{edges::EdgeRenderer, features::FeatureExtractor, gradient::GradientMap},
    classifier::{FAKE_LABEL, adapter::ClassifierAdapter},
    error::{BanknoteError, Result},
};

pub mod analysis;
pub mod classifier;
pub mod error;
pub mod image_utils;
pub mod report;

pub const DEFAULT_MODEL_PATH: &str = "model.json";

#[derive(Debug, Clone)]
pub struct InspectorConfig {
    pub model_path: PathBuf,
    pub parallel: bool,
    pub render_edges: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            parallel: true,
            render_edges: true,
        }
    }
}

/// Ties feature extraction, edge rendering and classification together.
///
/// The model is loaded once when the inspector is built; a failed load leaves
/// the inspector usable for features and edges while every classification
/// reports [`BanknoteError::ModelUnavailable`].
#[derive(Debug, Clone)]
pub struct BanknoteInspector {
    adapter: ClassifierAdapter,
    config: InspectorConfig,
}

impl BanknoteInspector {
    pub fn new() -> Self {
        Self::with_config(InspectorConfig::default())
    }

    pub fn with_config(config: InspectorConfig) -> Self {
        let adapter = ClassifierAdapter::load(&config.model_path);
        Self { adapter, config }
    }

    pub fn with_adapter(adapter: ClassifierAdapter, config: InspectorConfig) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &ClassifierAdapter {
        &self.adapter
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn model_loaded(&self) -> bool {
        self.adapter.is_available()
    }

    pub fn extract_features<P: AsRef<Path>>(&self, path: P) -> Result<FeatureVector> {
        FeatureExtractor::extract(path)
    }

    pub fn render_edges<P: AsRef<Path>>(&self, path: P) -> Result<EdgeImage> {
        EdgeRenderer::render_edges(path)
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction> {
        self.adapter.classify(features)
    }

    /// Runs the whole pipeline for one image, computing the gradient once.
    ///
    /// Only decoding and preprocessing errors fail the call; a missing model
    /// or an empty gradient end up inside the report.
    pub fn inspect<P: AsRef<Path>>(&self, path: P) -> Result<InspectionReport> {
        let path = path.as_ref();
        let image = image::open(path)?;

        let mut report = self.inspect_image(&image)?;
        report.path = Some(path.to_string_lossy().to_string());

        Ok(report)
    }

    pub fn inspect_image(&self, image: &DynamicImage) -> Result<InspectionReport> {
        let started = Instant::now();

        let gradient = GradientMap::from_image(image)?;
        let features = FeatureExtractor::from_gradient(&gradient);

        let edges = if self.config.render_edges {
            match EdgeRenderer::render_gradient(&gradient) {
                Ok(edges) => Some(edges),
                Err(BanknoteError::EmptyGradient) => Some(EdgeRenderer::blank()),
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let prediction = self.adapter.classify(&features);

        debug!(
            "Inspected {}x{} image in {:?}: {:?}",
            image.width(),
            image.height(),
            started.elapsed(),
            features
        );

        Ok(InspectionReport {
            path: None,
            features,
            edges,
            prediction,
        })
    }

    /// Inspects every path independently; one failing image does not affect
    /// the others. Results keep the input order.
    pub fn inspect_many<P>(&self, paths: &[P]) -> Vec<(PathBuf, Result<InspectionReport>)>
    where
        P: AsRef<Path> + Sync,
    {
        let run = |path: &P| {
            let path = path.as_ref();
            (path.to_path_buf(), self.inspect(path))
        };

        if self.config.parallel {
            paths.par_iter().map(run).collect()
        } else {
            paths.iter().map(run).collect()
        }
    }
}

impl Default for BanknoteInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Sobel gradient statistics, in the order the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub entropy: f64,
}

impl FeatureVector {
    pub const NAMES: [&'static str; 4] = ["variance", "skewness", "kurtosis", "entropy"];

    pub fn to_array(&self) -> [f64; 4] {
        [self.variance, self.skewness, self.kurtosis, self.entropy]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            variance: values[0],
            skewness: values[1],
            kurtosis: values[2],
            entropy: values[3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Real,
    Fake,
}

impl Verdict {
    pub fn from_label(label: i64) -> Self {
        if label == FAKE_LABEL {
            Verdict::Fake
        } else {
            Verdict::Real
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Real => "REAL banknote",
            Verdict::Fake => "FAKE banknote",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Real => write!(f, "REAL"),
            Verdict::Fake => write!(f, "FAKE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verdict: Verdict,
    /// Raw label returned by the model.
    pub label: i64,
    /// Highest class probability, as a percentage.
    pub confidence: f64,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}% confidence)",
            self.verdict.description(),
            self.confidence
        )
    }
}

#[derive(Debug, Clone)]
pub struct EdgeImage {
    pub image: GrayImage,
    /// Gradient magnitude mapped to 255.
    pub max_magnitude: f64,
}

impl EdgeImage {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct InspectionReport {
    pub path: Option<String>,
    pub features: FeatureVector,
    pub edges: Option<EdgeImage>,
    pub prediction: Result<Prediction>,
}

impl InspectionReport {
    /// Message shown to the user for this image.
    pub fn status(&self) -> String {
        match &self.prediction {
            Ok(prediction) => prediction.to_string(),
            Err(BanknoteError::ModelUnavailable(_)) => "Model not loaded".to_string(),
            Err(e) => format!("Error: {}", e),
        }
    }
}

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{BanknoteModel, forest::RandomForest, linear::LogisticRegression},
    error::Result,
};

/// On-disk model description, tagged by `"kind"`.
///
/// ```json
/// { "kind": "logistic_regression", "coefficients": [..4], "intercept": 0.3 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ModelArtifact {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let artifact = serde_json::from_reader(BufReader::new(file))?;
        Ok(artifact)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the artifact and turns it into a shareable model handle.
    pub fn into_model(self) -> Result<Arc<dyn BanknoteModel>> {
        match self {
            ModelArtifact::LogisticRegression(model) => {
                model.validate()?;
                Ok(Arc::new(model))
            }
            ModelArtifact::RandomForest(model) => {
                model.validate()?;
                Ok(Arc::new(model))
            }
        }
    }
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Arc<dyn BanknoteModel>> {
    ModelArtifact::from_path(path)?.into_model()
}

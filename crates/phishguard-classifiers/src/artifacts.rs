//! Path-addressed artifact store.
//!
//! Every artifact file is a bincode-encoded [`ArtifactHeader`] followed by an
//! opaque payload. The header names the format version, the pipeline variant
//! and the artifact kind so that a file is never silently decoded as
//! something else. Writes go to a `.tmp` sibling and are renamed into place.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{ModelSpec, PipelineVariant};
use crate::data_handling::LabelMapping;
use crate::error::{PipelineError, Result, Stage};
use crate::metrics::Scores;
use crate::models::Classifier;
use crate::preprocessing::{FeatureSchema, Preprocessor};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Preprocessor,
    Model,
    TrainArrays,
    TestArrays,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub variant: PipelineVariant,
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    header: ArtifactHeader,
    payload: Vec<u8>,
}

/// The selected classifier with everything inference needs besides the
/// preprocessor.
#[derive(Serialize, Deserialize, Debug)]
pub struct ModelArtifact {
    pub model: Classifier,
    pub spec: ModelSpec,
    pub label_mapping: LabelMapping,
    /// CRC32 of the preprocessor this model was trained against.
    pub preprocessor_fingerprint: u32,
    pub schema: FeatureSchema,
    pub held_out: Scores,
    /// Label column of the training table; tabular batch predictions are
    /// written under this name.
    pub target_column: String,
}

/// Transformed split arrays (`X` and `y`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArrayArtifact {
    #[serde(rename = "X")]
    pub x: Array2<f64>,
    pub y: Vec<usize>,
}

/// File locations for one variant under the artifact root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub dir: PathBuf,
    pub preprocessor: PathBuf,
    pub model: PathBuf,
    pub train: PathBuf,
    pub test: PathBuf,
    pub validation_report: PathBuf,
    pub training_report: PathBuf,
}

impl ArtifactLayout {
    pub fn for_variant(root: &Path, variant: PipelineVariant) -> Self {
        let dir = root.join(variant.as_str());
        let model = match variant {
            PipelineVariant::Tabular => dir.join("model").join("model.bin"),
            PipelineVariant::Text => dir.join("model.bin"),
        };
        Self {
            preprocessor: dir.join("preprocessor.bin"),
            model,
            train: dir.join("train.bin"),
            test: dir.join("test.bin"),
            validation_report: dir.join("validation_report.csv"),
            training_report: dir.join("training_report.html"),
            dir,
        }
    }

    /// Create every directory the layout writes into.
    pub fn create_dirs(&self) -> Result<()> {
        for path in [&self.preprocessor, &self.model] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn layout(&self, variant: PipelineVariant) -> ArtifactLayout {
        ArtifactLayout::for_variant(&self.root, variant)
    }

    /// Encode `value` behind a header and atomically replace `path`. The
    /// parent directory must already exist.
    pub fn save<T: Serialize>(
        &self,
        path: &Path,
        variant: PipelineVariant,
        kind: ArtifactKind,
        value: &T,
    ) -> Result<()> {
        let encode_error = |e: bincode::Error| {
            PipelineError::schema(Stage::Persistence, format!("cannot encode {:?}: {}", kind, e))
        };
        let envelope = Envelope {
            header: ArtifactHeader {
                format_version: FORMAT_VERSION,
                variant,
                kind,
                created_at: Utc::now(),
            },
            payload: bincode::serialize(value).map_err(encode_error)?,
        };
        let bytes = bincode::serialize(&envelope).map_err(encode_error)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).map_err(|e| PipelineError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e))?;
        log::debug!("Saved {:?} artifact to {}", kind, path.display());
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(
        &self,
        path: &Path,
        variant: PipelineVariant,
        kind: ArtifactKind,
    ) -> Result<T> {
        let (header, payload) = self.read_envelope(path)?;
        if header.variant != variant || header.kind != kind {
            return Err(PipelineError::schema(
                Stage::Persistence,
                format!(
                    "{} holds a {} {:?} artifact, expected {} {:?}",
                    path.display(),
                    header.variant,
                    header.kind,
                    variant,
                    kind
                ),
            ));
        }
        bincode::deserialize(&payload).map_err(|e| PipelineError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Header of an artifact without decoding its payload.
    pub fn header(&self, path: &Path) -> Result<ArtifactHeader> {
        Ok(self.read_envelope(path)?.0)
    }

    fn read_envelope(&self, path: &Path) -> Result<(ArtifactHeader, Vec<u8>)> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::ArtifactNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(PipelineError::io(path, e)),
        };
        let envelope: Envelope =
            bincode::deserialize(&bytes).map_err(|e| PipelineError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if envelope.header.format_version != FORMAT_VERSION {
            return Err(PipelineError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "format version {} is not supported (expected {})",
                    envelope.header.format_version, FORMAT_VERSION
                ),
            });
        }
        Ok((envelope.header, envelope.payload))
    }

    pub fn save_preprocessor(&self, preprocessor: &Preprocessor) -> Result<()> {
        let variant = preprocessor.variant();
        let path = self.layout(variant).preprocessor;
        self.save(&path, variant, ArtifactKind::Preprocessor, preprocessor)
    }

    pub fn save_model(&self, variant: PipelineVariant, model: &ModelArtifact) -> Result<()> {
        let path = self.layout(variant).model;
        self.save(&path, variant, ArtifactKind::Model, model)
    }

    pub fn save_arrays(
        &self,
        variant: PipelineVariant,
        kind: ArtifactKind,
        arrays: &ArrayArtifact,
    ) -> Result<()> {
        let layout = self.layout(variant);
        let path = match kind {
            ArtifactKind::TestArrays => layout.test,
            _ => layout.train,
        };
        self.save(&path, variant, kind, arrays)
    }

    /// Load the preprocessor and model for `variant` and check that the model
    /// was trained against exactly this preprocessor.
    pub fn load_pair(&self, variant: PipelineVariant) -> Result<(Preprocessor, ModelArtifact)> {
        let layout = self.layout(variant);
        let preprocessor: Preprocessor =
            self.load(&layout.preprocessor, variant, ArtifactKind::Preprocessor)?;
        let model: ModelArtifact = self.load(&layout.model, variant, ArtifactKind::Model)?;

        let fingerprint = preprocessor.fingerprint()?;
        if fingerprint != model.preprocessor_fingerprint || preprocessor.schema != model.schema {
            return Err(PipelineError::schema(
                Stage::Prediction,
                format!(
                    "model at {} was trained against preprocessor {:08x}, found {:08x}",
                    layout.model.display(),
                    model.preprocessor_fingerprint,
                    fingerprint
                ),
            ));
        }
        Ok((preprocessor, model))
    }
}

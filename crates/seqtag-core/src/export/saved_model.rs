//! # Servable Package
//!
//! A servable package is a directory holding a JSON manifest (signature,
//! tags, model config) and the model variables in safetensors format:
//!
//! ```text
//! <export_dir>/
//!     saved_model.json
//!     variables/
//!         variables.safetensors
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use candle_core::{DType as TensorDType, Device, Tensor};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NerConfig;
use crate::error::{NerError, Result};
use crate::export::signature::{DEFAULT_SIGNATURE_KEY, SERVING_TAG, SignatureDef};

pub const MANIFEST_FILE: &str = "saved_model.json";
pub const VARIABLES_DIR: &str = "variables";
pub const VARIABLES_FILE: &str = "variables.safetensors";

/// Name of the variable holding the CRF transition matrix.
pub const TRANS_PARAMS: &str = "trans_params";

const FORMAT_VERSION: u32 = 1;

/// Contents of `saved_model.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub format_version: u32,
    pub tags: Vec<String>,
    pub signature_def: BTreeMap<String, SignatureDef>,
    pub config: NerConfig,
    /// Names of the stored variables, sorted.
    pub variables: Vec<String>,
}

impl ExportManifest {
    /// The default prediction signature.
    pub fn signature(&self) -> Option<&SignatureDef> {
        self.signature_def.get(DEFAULT_SIGNATURE_KEY)
    }
}

/// An in-memory trained tagger: its configuration and named variables.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    config: NerConfig,
    variables: HashMap<String, Tensor>,
}

impl TrainedModel {
    pub fn new(config: NerConfig, variables: HashMap<String, Tensor>) -> Self {
        Self { config, variables }
    }

    /// A model whose only variable is the transition matrix.
    pub fn from_transitions(config: NerConfig, trans_params: &[Vec<f32>]) -> Result<Self> {
        let rows = trans_params.len();
        let cols = trans_params.first().map_or(0, Vec::len);
        if trans_params.iter().any(|r| r.len() != cols) {
            return Err(NerError::DimensionMismatch(
                "transition matrix rows differ in length".into(),
            ));
        }

        let flat: Vec<f32> = trans_params.iter().flatten().copied().collect();
        let tensor = Tensor::from_vec(flat, (rows, cols), &Device::Cpu)?;

        let mut variables = HashMap::new();
        variables.insert(TRANS_PARAMS.to_string(), tensor);
        Ok(Self::new(config, variables))
    }

    /// Load variables from a safetensors checkpoint.
    pub fn from_safetensors(config: NerConfig, path: impl AsRef<Path>) -> Result<Self> {
        let variables = candle_core::safetensors::load(path.as_ref(), &Device::Cpu)?;
        Ok(Self::new(config, variables))
    }

    pub fn config(&self) -> &NerConfig {
        &self.config
    }

    pub fn variable(&self, name: &str) -> Option<&Tensor> {
        self.variables.get(name)
    }

    pub fn insert_variable(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.variables.insert(name.into(), tensor);
    }

    /// Export this model as a servable package at `export_dir`.
    pub fn save_prediction_model(&self, export_dir: impl AsRef<Path>) -> Result<()> {
        ServableExporter::new().export(self, export_dir)?;
        Ok(())
    }
}

/// Writes servable packages.
#[derive(Debug, Clone, Default)]
pub struct ServableExporter;

impl ServableExporter {
    pub fn new() -> Self {
        Self
    }

    /// Write `model` to `export_dir`.
    ///
    /// # Errors
    ///
    /// - `NerError::ExportDirExists` if `export_dir` already exists
    /// - `NerError::MissingVariable` / `DimensionMismatch` if the model has
    ///   no `[ntags, ntags]` transition matrix
    /// - I/O and tensor serialization errors, unchanged
    ///
    /// The transition matrix is stored as `f32` whatever its checkpoint
    /// dtype. A failed write removes `export_dir` again.
    pub fn export(&self, model: &TrainedModel, export_dir: impl AsRef<Path>) -> Result<ExportManifest> {
        let export_dir = export_dir.as_ref();
        if export_dir.exists() {
            return Err(NerError::ExportDirExists(export_dir.to_path_buf()));
        }

        let trans = check_transitions(model)?;
        let mut variables = model.variables.clone();
        variables.insert(TRANS_PARAMS.to_string(), trans);

        let manifest = remove_on_error(export_dir, write_package(model, &variables, export_dir))?;

        info!(
            dir = %export_dir.display(),
            variables = manifest.variables.len(),
            "exported servable model"
        );
        Ok(manifest)
    }
}

fn write_package(
    model: &TrainedModel,
    variables: &HashMap<String, Tensor>,
    export_dir: &Path,
) -> Result<ExportManifest> {
    let variables_dir = export_dir.join(VARIABLES_DIR);
    fs::create_dir_all(&variables_dir)?;
    candle_core::safetensors::save(variables, variables_dir.join(VARIABLES_FILE))?;

    let mut names: Vec<String> = variables.keys().cloned().collect();
    names.sort();

    let mut signature_def = BTreeMap::new();
    signature_def.insert(
        DEFAULT_SIGNATURE_KEY.to_string(),
        SignatureDef::predict(&model.config),
    );

    let manifest = ExportManifest {
        format_version: FORMAT_VERSION,
        tags: vec![SERVING_TAG.to_string()],
        signature_def,
        config: model.config.clone(),
        variables: names,
    };

    let mut writer = BufWriter::new(File::create(export_dir.join(MANIFEST_FILE))?);
    serde_json::to_writer_pretty(&mut writer, &manifest)?;
    writer.flush()?;

    Ok(manifest)
}

/// Delete a partially written `dir` when `result` is an error.
fn remove_on_error<T>(dir: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() && dir.exists() {
        if let Err(err) = fs::remove_dir_all(dir) {
            warn!(dir = %dir.display(), error = %err, "failed to remove partial export");
        }
    }
    result
}

/// The `[ntags, ntags]` transition matrix of `model` as `f32`.
fn check_transitions(model: &TrainedModel) -> Result<Tensor> {
    let ntags = model.config.ntags();
    let trans = model
        .variable(TRANS_PARAMS)
        .ok_or_else(|| NerError::MissingVariable(TRANS_PARAMS.to_string()))?;

    match trans.dims() {
        [rows, cols] if *rows == ntags && *cols == ntags => Ok(trans.to_dtype(TensorDType::F32)?),
        dims => Err(NerError::DimensionMismatch(format!(
            "{TRANS_PARAMS} has shape {dims:?}, expected [{ntags}, {ntags}]"
        ))),
    }
}

/// A servable package read back from disk.
#[derive(Debug, Clone)]
pub struct SavedModel {
    dir: PathBuf,
    manifest: ExportManifest,
}

impl SavedModel {
    /// Read the manifest of the package at `export_dir`.
    pub fn load(export_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = export_dir.as_ref().to_path_buf();
        let raw = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: ExportManifest = serde_json::from_str(&raw)?;
        Ok(Self { dir, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &ExportManifest {
        &self.manifest
    }

    /// Load every stored variable onto the CPU.
    pub fn variables(&self) -> Result<HashMap<String, Tensor>> {
        let path = self.dir.join(VARIABLES_DIR).join(VARIABLES_FILE);
        Ok(candle_core::safetensors::load(path, &Device::Cpu)?)
    }

    /// The stored transition matrix.
    pub fn trans_params(&self) -> Result<Vec<Vec<f32>>> {
        let variables = self.variables()?;
        let trans = variables
            .get(TRANS_PARAMS)
            .ok_or_else(|| NerError::MissingVariable(TRANS_PARAMS.to_string()))?;
        Ok(trans.to_vec2::<f32>()?)
    }

    /// Rebuild the in-memory model.
    pub fn into_trained_model(self) -> Result<TrainedModel> {
        let variables = self.variables()?;
        Ok(TrainedModel::new(self.manifest.config, variables))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::decode::tags::TagSet;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// A fresh, not yet existing path under the system temp dir.
    fn scratch_dir(name: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("seqtag-{}-{}-{}", name, std::process::id(), n))
    }

    fn config() -> NerConfig {
        NerConfig::new()
            .with_tags(TagSet::new(["O", "B-PER", "I-PER"]).unwrap())
            .with_chars(false)
    }

    fn transitions() -> Vec<Vec<f32>> {
        vec![
            vec![0.5, 0.1, -1.0],
            vec![0.2, -0.3, 0.9],
            vec![0.0, 0.4, 0.6],
        ]
    }

    #[test]
    fn test_export_and_load() {
        let dir = scratch_dir("export").join("1");
        let model = TrainedModel::from_transitions(config(), &transitions()).unwrap();

        let manifest = ServableExporter::new().export(&model, &dir).unwrap();
        assert!(dir.join(MANIFEST_FILE).is_file());
        assert!(dir.join(VARIABLES_DIR).join(VARIABLES_FILE).is_file());
        assert_eq!(manifest.tags, vec!["serve"]);
        assert_eq!(manifest.variables, vec!["trans_params"]);

        let saved = SavedModel::load(&dir).unwrap();
        assert_eq!(saved.manifest(), &manifest);

        let sig = saved.manifest().signature().unwrap();
        assert!(sig.inputs.contains_key("word_ids"));
        assert!(sig.inputs.contains_key("sequence_lengths"));
        assert!(sig.inputs.contains_key("dropout"));
        assert!(sig.outputs.contains_key("logits"));
        assert_eq!(sig.outputs["trans_params"].shape, vec![3, 3]);

        assert_eq!(saved.trans_params().unwrap(), transitions());

        fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_export_refuses_existing_dir() {
        let dir = scratch_dir("exists");
        fs::create_dir_all(&dir).unwrap();

        let model = TrainedModel::from_transitions(config(), &transitions()).unwrap();
        let err = model.save_prediction_model(&dir).unwrap_err();
        assert!(matches!(err, NerError::ExportDirExists(_)));
        assert!(!dir.join(MANIFEST_FILE).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_export_requires_transitions() {
        let dir = scratch_dir("missing");
        let model = TrainedModel::new(config(), HashMap::new());

        let err = model.save_prediction_model(&dir).unwrap_err();
        assert!(matches!(err, NerError::MissingVariable(ref name) if name == "trans_params"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_export_rejects_wrong_transition_shape() {
        let dir = scratch_dir("shape");
        let model = TrainedModel::from_transitions(config(), &[vec![0.0, 1.0], vec![1.0, 0.0]])
            .unwrap();

        let err = model.save_prediction_model(&dir).unwrap_err();
        assert!(matches!(err, NerError::DimensionMismatch(_)));
    }

    #[test]
    fn test_export_stores_f64_transitions_as_f32() {
        let dir = scratch_dir("f64");
        let flat: Vec<f64> = transitions().iter().flatten().map(|&v| v as f64).collect();
        let trans = Tensor::from_vec(flat, (3, 3), &Device::Cpu).unwrap();
        let mut variables = HashMap::new();
        variables.insert(TRANS_PARAMS.to_string(), trans);
        let model = TrainedModel::new(config(), variables);

        let manifest = ServableExporter::new().export(&model, &dir).unwrap();
        assert_eq!(
            manifest.signature().unwrap().outputs["trans_params"].dtype,
            crate::export::signature::DType::Float32
        );

        let saved = SavedModel::load(&dir).unwrap();
        let stored = saved.variables().unwrap();
        assert_eq!(stored[TRANS_PARAMS].dtype(), TensorDType::F32);
        assert_eq!(saved.trans_params().unwrap(), transitions());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_write_removes_partial_export() {
        let dir = scratch_dir("partial");
        fs::create_dir_all(dir.join(VARIABLES_DIR)).unwrap();

        let result: Result<()> = Err(NerError::Tensor("write failed".into()));
        let err = remove_on_error(&dir, result).unwrap_err();

        assert!(matches!(err, NerError::Tensor(_)));
        assert!(!dir.exists());
    }

    #[test]
    fn test_successful_write_keeps_export() {
        let dir = scratch_dir("kept");
        fs::create_dir_all(&dir).unwrap();

        remove_on_error(&dir, Ok(())).unwrap();
        assert!(dir.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_round_trip_keeps_extra_variables() {
        let dir = scratch_dir("extra");
        let mut model = TrainedModel::from_transitions(config(), &transitions()).unwrap();
        let embeddings = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], (2, 2), &Device::Cpu).unwrap();
        model.insert_variable("word_embeddings", embeddings);

        model.save_prediction_model(&dir).unwrap();
        let restored = SavedModel::load(&dir).unwrap().into_trained_model().unwrap();

        let emb = restored.variable("word_embeddings").unwrap();
        assert_eq!(
            emb.to_vec2::<f32>().unwrap(),
            vec![vec![1.0, 2.0], vec![3.0, 4.0]]
        );
        assert_eq!(restored.config(), model.config());

        fs::remove_dir_all(&dir).unwrap();
    }
}

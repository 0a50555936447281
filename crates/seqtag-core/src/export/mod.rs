pub mod saved_model;
pub mod signature;

pub use saved_model::{
    ExportManifest, MANIFEST_FILE, SavedModel, ServableExporter, TRANS_PARAMS, TrainedModel,
    VARIABLES_DIR, VARIABLES_FILE,
};
pub use signature::{DEFAULT_SIGNATURE_KEY, DType, SERVING_TAG, SignatureDef, TensorSpec};

//! Model loading, with conversion to the intermediate representation when the
//! backend asks for it.

use std::path::{Path, PathBuf};

use log::info;

use crate::backend::Backend;
use crate::errors::{BenchError, BenchResult};
use crate::runtime::{InferenceRuntime, ModelConverter, ModelSource};

/// Extension of the structure file produced by conversion.
pub const STRUCTURE_EXTENSION: &str = "nnef";
/// Extension of the weights file produced by conversion.
pub const WEIGHTS_EXTENSION: &str = "bin";

/// The two files an intermediate representation is stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrArtifacts {
    pub structure: PathBuf,
    pub weights: PathBuf,
}

impl IrArtifacts {
    /// Derives artifact paths beside the model by replacing its extension.
    pub fn for_model(model_path: &Path) -> Self {
        Self {
            structure: model_path.with_extension(STRUCTURE_EXTENSION),
            weights: model_path.with_extension(WEIGHTS_EXTENSION),
        }
    }
}

/// Converts `model_path` and returns the artifacts written.
///
/// The model must exist; this is checked before the converter is invoked.
pub fn convert_to_ir<C: ModelConverter + ?Sized>(
    converter: &C,
    model_path: &Path,
) -> BenchResult<IrArtifacts> {
    if !model_path.is_file() {
        return Err(BenchError::ModelNotFound {
            path: model_path.to_path_buf(),
        });
    }

    let artifacts = IrArtifacts::for_model(model_path);
    converter.convert(model_path, &artifacts)?;
    info!(
        "Converted {} -> {}, {}",
        model_path.display(),
        artifacts.structure.display(),
        artifacts.weights.display()
    );

    Ok(artifacts)
}

/// Loads a network through `backend`. The returned handle is unbound.
pub fn load_network<R, C>(
    runtime: &R,
    converter: &C,
    model_path: &Path,
    backend: Backend,
) -> BenchResult<R::Network>
where
    R: InferenceRuntime + ?Sized,
    C: ModelConverter + ?Sized,
{
    let source = if backend.requires_conversion() {
        ModelSource::Ir(convert_to_ir(converter, model_path)?)
    } else {
        ModelSource::File(model_path.to_path_buf())
    };

    runtime.read_network(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifacts_replace_the_extension() {
        let artifacts = IrArtifacts::for_model(Path::new("models/yolo.v8.onnx"));
        assert_eq!(artifacts.structure, PathBuf::from("models/yolo.v8.nnef"));
        assert_eq!(artifacts.weights, PathBuf::from("models/yolo.v8.bin"));
    }

    #[test]
    fn test_artifacts_for_model_without_extension() {
        let artifacts = IrArtifacts::for_model(Path::new("net"));
        assert_eq!(artifacts.structure, PathBuf::from("net.nnef"));
        assert_eq!(artifacts.weights, PathBuf::from("net.bin"));
    }
}

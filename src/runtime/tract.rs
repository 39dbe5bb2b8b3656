//! tract-backed runtime.
//!
//! The native backend reads ONNX files directly. The intermediate
//! representation is tract's NNEF serialization split in two: the textual
//! `graph.nnef` document becomes the structure file, every other archive entry
//! (tensor `.dat` files, quantization tables) goes into a weights tar.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tar::{Archive, Builder, Header};
use tract_onnx::WithOnnx;
use tract_onnx::prelude::*;

use super::{InferenceRuntime, ModelConverter, ModelSource, Network};
use crate::backend::{Backend, Target};
use crate::convert::IrArtifacts;
use crate::devices::GpuBinding;
use crate::errors::{BenchError, BenchResult, error_chain};
use crate::tensor::InputTensor;

/// Name of the graph document inside an NNEF archive.
const GRAPH_ENTRY: &str = "graph.nnef";

pub(crate) type TractRunnableModel =
    RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn nnef_framework() -> tract_nnef::framework::Nnef {
    tract_nnef::nnef().with_tract_core().with_onnx()
}

fn describe(error: &TractError) -> String {
    format!("{:#}", error)
}

/// Reads ONNX files and converted NNEF artifacts.
#[derive(Debug, Default)]
pub struct TractRuntime;

impl TractRuntime {
    pub fn new() -> Self {
        Self
    }

    fn read_onnx(&self, path: &Path) -> BenchResult<TractNetwork> {
        let load_error = |e: TractError| BenchError::Load {
            path: path.to_path_buf(),
            message: describe(&e),
        };

        let model = tract_onnx::onnx().model_for_path(path).map_err(load_error)?;
        let inputs = model.input_outlets().map_err(load_error)?.len();
        let outputs = model.output_outlets().map_err(load_error)?.len();

        Ok(TractNetwork::new(NetworkGraph::Onnx(model), inputs, outputs))
    }

    fn read_ir(&self, artifacts: &IrArtifacts) -> BenchResult<TractNetwork> {
        let load_error = |e: TractError| BenchError::Load {
            path: artifacts.structure.clone(),
            message: describe(&e),
        };

        let archive = join_archive(artifacts)?;
        let model = nnef_framework()
            .model_for_read(&mut Cursor::new(archive))
            .map_err(load_error)?;
        let inputs = model.input_outlets().map_err(load_error)?.len();
        let outputs = model.output_outlets().map_err(load_error)?.len();

        Ok(TractNetwork::new(NetworkGraph::Nnef(model), inputs, outputs))
    }
}

impl InferenceRuntime for TractRuntime {
    type Network = TractNetwork;

    fn read_network(&self, source: &ModelSource) -> BenchResult<TractNetwork> {
        match source {
            ModelSource::File(path) => {
                debug!("Reading ONNX model {}", path.display());
                self.read_onnx(path)
            }
            ModelSource::Ir(artifacts) => {
                debug!(
                    "Reading NNEF model {} + {}",
                    artifacts.structure.display(),
                    artifacts.weights.display()
                );
                self.read_ir(artifacts)
            }
        }
    }
}

enum NetworkGraph {
    Onnx(InferenceModel),
    Nnef(TypedModel),
}

/// A tract model plus its backend/target selection and compiled plan.
///
/// The plan is compiled on the first forward pass, and again whenever the
/// input dimensions change.
pub struct TractNetwork {
    graph: NetworkGraph,
    inputs: usize,
    outputs: usize,
    backend: Option<Backend>,
    target: Option<Target>,
    gpu: Option<GpuBinding>,
    input: Option<(Vec<usize>, TValue)>,
    plan: Option<(Vec<usize>, TractRunnableModel)>,
}

impl TractNetwork {
    fn new(graph: NetworkGraph, inputs: usize, outputs: usize) -> Self {
        Self {
            graph,
            inputs,
            outputs,
            backend: None,
            target: None,
            gpu: None,
            input: None,
            plan: None,
        }
    }

    fn compile(&self, dims: &[usize]) -> TractResult<TractRunnableModel> {
        match &self.graph {
            NetworkGraph::Onnx(model) => model
                .clone()
                .with_input_fact(0, f32::fact(dims.to_vec()).into())?
                .into_optimized()?
                .into_runnable(),
            NetworkGraph::Nnef(model) => model.clone().into_optimized()?.into_runnable(),
        }
    }
}

impl Network for TractNetwork {
    fn input_count(&self) -> usize {
        self.inputs
    }

    fn output_count(&self) -> usize {
        self.outputs
    }

    fn set_preferable_backend(&mut self, backend: Backend) {
        self.backend = Some(backend);
    }

    fn set_preferable_target(&mut self, target: Target) -> BenchResult<()> {
        match target {
            Target::Cpu => self.gpu = None,
            Target::OpenCl => {
                let binding = GpuBinding::acquire().map_err(|e| BenchError::Bind {
                    target,
                    message: error_chain(&e).join(": "),
                })?;
                warn!(
                    "tract has no {} kernels, executing on CPU while holding '{}'",
                    target,
                    binding.adapter_name()
                );
                self.gpu = Some(binding);
            }
        }
        self.target = Some(target);
        Ok(())
    }

    fn set_input(&mut self, input: &InputTensor) -> BenchResult<()> {
        let tensor = Tensor::from_shape::<f32>(input.dims(), input.data()).map_err(|e| {
            BenchError::Execution {
                message: describe(&e),
            }
        })?;
        let value: TValue = tensor.into();
        self.input = Some((input.dims().to_vec(), value));
        Ok(())
    }

    fn forward(&mut self) -> BenchResult<Vec<usize>> {
        if self.backend.is_none() || self.target.is_none() {
            return Err(BenchError::NotBound);
        }
        let (dims, value) = self.input.clone().ok_or(BenchError::MissingInput)?;

        let stale = self.plan.as_ref().is_none_or(|(planned, _)| *planned != dims);
        if stale {
            match &self.gpu {
                Some(gpu) => debug!("Compiling plan for input {:?} ({})", dims, gpu.adapter_name()),
                None => debug!("Compiling plan for input {:?}", dims),
            }
            let plan = self.compile(&dims).map_err(|e| BenchError::Execution {
                message: describe(&e),
            })?;
            self.plan = Some((dims, plan));
        }

        let Some((_, plan)) = self.plan.as_ref() else {
            return Err(BenchError::NotBound);
        };
        let outputs = plan.run(tvec!(value)).map_err(|e| BenchError::Execution {
            message: describe(&e),
        })?;

        outputs
            .first()
            .map(|output| output.shape().to_vec())
            .ok_or_else(|| BenchError::Execution {
                message: "network produced no outputs".to_string(),
            })
    }
}

/// Converts ONNX models to the split NNEF representation.
#[derive(Debug, Default)]
pub struct NnefConverter;

impl NnefConverter {
    pub fn new() -> Self {
        Self
    }
}

impl ModelConverter for NnefConverter {
    fn convert(&self, model_path: &Path, artifacts: &IrArtifacts) -> BenchResult<()> {
        let conversion_error = |message: String| BenchError::Conversion {
            path: model_path.to_path_buf(),
            message,
        };

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| model.into_typed())
            .and_then(|model| model.into_decluttered())
            .map_err(|e| conversion_error(describe(&e)))?;

        let mut archive = Vec::new();
        nnef_framework()
            .write(&model, &mut archive)
            .map_err(|e| conversion_error(describe(&e)))?;

        split_archive(&archive, artifacts).map_err(|e| match e {
            BenchError::Io { source } => conversion_error(source.to_string()),
            other => other,
        })
    }
}

/// Writes the graph document to the structure file and every other entry to
/// the weights tar. Entries keep their order and get fixed metadata, so the
/// output only depends on the archive contents.
fn split_archive(archive: &[u8], artifacts: &IrArtifacts) -> BenchResult<()> {
    let mut graph = None;
    let mut weights = Builder::new(Vec::new());

    for entry in Archive::new(Cursor::new(archive)).entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;

        if path.as_path() == Path::new(GRAPH_ENTRY) {
            graph = Some(data);
        } else {
            append_entry(&mut weights, &path, &data)?;
        }
    }

    let graph = graph.ok_or_else(|| BenchError::Io {
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} not found in serialized model", GRAPH_ENTRY),
        ),
    })?;

    fs::write(&artifacts.structure, graph)?;
    fs::write(&artifacts.weights, weights.into_inner()?)?;
    Ok(())
}

/// Rebuilds an NNEF archive from the structure and weights files.
fn join_archive(artifacts: &IrArtifacts) -> BenchResult<Vec<u8>> {
    let read = |path: &PathBuf| {
        fs::read(path).map_err(|e| BenchError::Load {
            path: path.clone(),
            message: e.to_string(),
        })
    };
    let graph = read(&artifacts.structure)?;
    let weights = read(&artifacts.weights)?;

    let mut archive = Builder::new(Vec::new());
    append_entry(&mut archive, Path::new(GRAPH_ENTRY), &graph)?;

    for entry in Archive::new(Cursor::new(weights)).entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        append_entry(&mut archive, &path, &data)?;
    }

    Ok(archive.into_inner()?)
}

fn append_entry(builder: &mut Builder<Vec<u8>>, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, path, Cursor::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for (path, data) in entries {
            append_entry(&mut builder, Path::new(path), data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn entries_of(archive: &[u8]) -> Vec<(PathBuf, Vec<u8>)> {
        Archive::new(Cursor::new(archive))
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let path = entry.path().unwrap().into_owned();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (path, data)
            })
            .collect()
    }

    fn artifacts_in(dir: &Path) -> IrArtifacts {
        IrArtifacts::for_model(&dir.join("net.onnx"))
    }

    #[test]
    fn test_split_then_join_restores_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = artifacts_in(dir.path());
        let archive = archive_of(&[
            (
                "graph.nnef",
                &b"version 1.0;\ngraph net(input) -> (output) {}\n"[..],
            ),
            ("conv1.weight.dat", &[1u8, 2, 3, 4][..]),
            ("blocks/fc.bias.dat", &[9u8, 8][..]),
        ]);

        split_archive(&archive, &artifacts).unwrap();
        assert_eq!(
            fs::read_to_string(&artifacts.structure).unwrap(),
            "version 1.0;\ngraph net(input) -> (output) {}\n"
        );

        let weights = entries_of(&fs::read(&artifacts.weights).unwrap());
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].0, PathBuf::from("conv1.weight.dat"));

        let joined = entries_of(&join_archive(&artifacts).unwrap());
        assert_eq!(joined, entries_of(&archive));
    }

    #[test]
    fn test_split_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = artifacts_in(dir.path());
        let archive = archive_of(&[("graph.nnef", &b"graph"[..]), ("w.dat", &[0u8, 1][..])]);

        split_archive(&archive, &artifacts).unwrap();
        let first = fs::read(&artifacts.weights).unwrap();
        split_archive(&archive, &artifacts).unwrap();
        let second = fs::read(&artifacts.weights).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_split_without_graph_fails() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = artifacts_in(dir.path());
        let archive = archive_of(&[("w.dat", &[0u8][..])]);

        assert!(split_archive(&archive, &artifacts).is_err());
        assert!(!artifacts.structure.exists());
    }

    #[test]
    fn test_missing_onnx_file_is_a_load_error() {
        let result = TractRuntime::new()
            .read_network(&ModelSource::File(PathBuf::from("/nonexistent/net.onnx")));
        assert!(matches!(result, Err(BenchError::Load { .. })));
    }

    #[test]
    fn test_missing_artifacts_are_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TractRuntime::new().read_network(&ModelSource::Ir(artifacts_in(dir.path())));
        assert!(matches!(result, Err(BenchError::Load { .. })));
    }

    #[test]
    fn test_malformed_onnx_is_a_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("broken.onnx");
        fs::write(&model_path, b"definitely not protobuf").unwrap();

        let result = NnefConverter::new().convert(&model_path, &IrArtifacts::for_model(&model_path));
        assert!(matches!(result, Err(BenchError::Conversion { .. })));
    }
}

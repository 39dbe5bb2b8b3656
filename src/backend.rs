//! Backend and device routing.
//!
//! The set of backends, device kinds and targets is closed. Which device may
//! run on which backend, and under which target, is described by
//! [`COMPATIBILITY_TABLE`] rather than by control flow, so the routing can be
//! checked in isolation from any runtime.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use thiserror::Error;

/// Execution engine a network is loaded through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// The model file is read as-is by the runtime.
    Native,
    /// The model is converted to a structure file plus a weights file first.
    IntermediateRepresentation,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Native, Backend::IntermediateRepresentation];

    pub fn identifier(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::IntermediateRepresentation => "intermediate-representation",
        }
    }

    /// Whether loading through this backend needs a conversion step.
    pub fn requires_conversion(&self) -> bool {
        matches!(self, Backend::IntermediateRepresentation)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Backend {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.identifier() == s)
            .ok_or_else(|| UnknownIdentifier(s.to_string()))
    }
}

/// Kind of compute device a device identifier denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Cpu,
    Gpu,
}

impl DeviceKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "CPU",
            DeviceKind::Gpu => "GPU",
        }
    }
}

impl FromStr for DeviceKind {
    type Err = UnknownIdentifier;

    /// Matches exactly: `"GPU.1"` is not a recognised kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CPU" => Ok(DeviceKind::Cpu),
            "GPU" => Ok(DeviceKind::Gpu),
            _ => Err(UnknownIdentifier(s.to_string())),
        }
    }
}

/// Runtime binding directive selecting where kernels execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Cpu,
    OpenCl,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Cpu => f.write_str("CPU"),
            Target::OpenCl => f.write_str("OpenCL"),
        }
    }
}

/// Identifier that is not part of a closed set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown identifier '{0}'")]
pub struct UnknownIdentifier(pub String);

/// Admitted (device kind, backend) combinations and the target each maps to.
pub const COMPATIBILITY_TABLE: [(DeviceKind, Backend, Target); 4] = [
    (DeviceKind::Cpu, Backend::Native, Target::Cpu),
    (DeviceKind::Cpu, Backend::IntermediateRepresentation, Target::Cpu),
    (DeviceKind::Gpu, Backend::Native, Target::OpenCl),
    (DeviceKind::Gpu, Backend::IntermediateRepresentation, Target::OpenCl),
];

/// Looks up the target for a device kind on a backend.
pub fn target_for(kind: DeviceKind, backend: Backend) -> Option<Target> {
    COMPATIBILITY_TABLE
        .iter()
        .find(|(k, b, _)| *k == kind && *b == backend)
        .map(|(_, _, target)| *target)
}

/// A device/backend combination admitted for benchmarking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkPair {
    pub device: String,
    pub kind: DeviceKind,
    pub backend: Backend,
    pub target: Target,
}

impl fmt::Display for BenchmarkPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {}", self.backend, self.device)
    }
}

/// Resolves a single device/backend identifier pair, or `None` when either
/// side is unrecognised or the table has no entry for it.
pub fn resolve(device: &str, backend: &str) -> Option<BenchmarkPair> {
    let backend = backend.parse::<Backend>().ok()?;
    let kind = device.parse::<DeviceKind>().ok()?;
    let target = target_for(kind, backend)?;

    Some(BenchmarkPair {
        device: device.to_string(),
        kind,
        backend,
        target,
    })
}

/// Crosses devices with backends (device-major) and keeps the admitted pairs.
///
/// Rejected combinations never fail the run. They are logged at debug level,
/// or at warn level when `warn_on_skipped` is set.
pub fn resolve_pairs<D, B>(devices: &[D], backends: &[B], warn_on_skipped: bool) -> Vec<BenchmarkPair>
where
    D: AsRef<str>,
    B: AsRef<str>,
{
    let mut pairs = Vec::new();

    for device in devices {
        for backend in backends {
            let (device, backend) = (device.as_ref(), backend.as_ref());
            match resolve(device, backend) {
                Some(pair) => pairs.push(pair),
                None if warn_on_skipped => {
                    warn!("Skipping unsupported combination: {} with {}", backend, device)
                }
                None => debug!("Skipping unsupported combination: {} with {}", backend, device),
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKENDS: [&str; 2] = ["native", "intermediate-representation"];

    #[test]
    fn test_backend_identifiers_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(backend.identifier().parse::<Backend>(), Ok(backend));
        }
        assert!("opencv".parse::<Backend>().is_err());
    }

    #[test]
    fn test_unknown_identifier_message() {
        let error = "GPU.1".parse::<DeviceKind>().unwrap_err();
        assert_eq!(error, UnknownIdentifier("GPU.1".to_string()));
        assert_eq!(error.to_string(), "unknown identifier 'GPU.1'");
    }

    #[test]
    fn test_cpu_maps_to_cpu_target_on_every_backend() {
        for backend in BACKENDS {
            let pair = resolve("CPU", backend).expect("CPU must be admitted");
            assert_eq!(pair.target, Target::Cpu);
            assert_eq!(pair.kind, DeviceKind::Cpu);
        }
    }

    #[test]
    fn test_gpu_maps_to_opencl_target_on_every_backend() {
        for backend in BACKENDS {
            let pair = resolve("GPU", backend).expect("GPU must be admitted");
            assert_eq!(pair.target, Target::OpenCl);
        }
    }

    #[test]
    fn test_unrecognised_devices_are_never_admitted() {
        for device in ["NPU", "GPU.1", "gpu", "cpu", "", "HETERO:GPU,CPU"] {
            for backend in BACKENDS {
                assert!(resolve(device, backend).is_none(), "{} admitted", device);
            }
        }
    }

    #[test]
    fn test_unrecognised_backends_are_never_admitted() {
        for backend in ["openvino", "Native", "", "tensorrt"] {
            assert!(resolve("CPU", backend).is_none());
            assert!(resolve("GPU", backend).is_none());
        }
    }

    #[test]
    fn test_resolve_pairs_is_device_major() {
        let devices = ["GPU", "NPU", "CPU"];
        let backends = ["intermediate-representation", "bogus", "native"];

        let pairs = resolve_pairs(&devices, &backends, false);
        let labels: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();

        assert_eq!(
            labels,
            vec![
                "intermediate-representation with GPU",
                "native with GPU",
                "intermediate-representation with CPU",
                "native with CPU",
            ]
        );
    }

    #[test]
    fn test_resolve_pairs_with_no_devices() {
        let devices: [&str; 0] = [];
        assert!(resolve_pairs(&devices, &BACKENDS, true).is_empty());
    }

    #[test]
    fn test_every_table_entry_is_reachable() {
        for (kind, backend, target) in COMPATIBILITY_TABLE {
            assert_eq!(target_for(kind, backend), Some(target));
            let pair = resolve(kind.identifier(), backend.identifier()).unwrap();
            assert_eq!(pair.target, target);
        }
    }
}

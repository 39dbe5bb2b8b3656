//! Compute device discovery.
//!
//! Device identifiers follow the usual inference-runtime naming: the host
//! processor is always `"CPU"`, hardware GPU adapters are `"GPU"`, `"GPU.1"`,
//! `"GPU.2"` and so on in adapter order.

use log::{debug, info};
use pollster::FutureExt;

use crate::errors::{DeviceError, DeviceResult};

/// Source of the compute devices a benchmark run may target.
pub trait DeviceEnumerator {
    /// Queries the host once. An empty list means there is nothing to
    /// benchmark and is not an error.
    fn list_devices(&self) -> DeviceResult<Vec<String>>;
}

/// Host devices discovered through wgpu adapter enumeration.
#[derive(Debug, Default)]
pub struct HostDevices {
    backends: Option<wgpu::Backends>,
}

impl HostDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts enumeration to the given graphics backends.
    pub fn with_backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = Some(backends);
        self
    }
}

impl DeviceEnumerator for HostDevices {
    fn list_devices(&self) -> DeviceResult<Vec<String>> {
        let adapters = hardware_gpu_adapters(self.backends.unwrap_or(wgpu::Backends::all()));

        let mut devices = vec!["CPU".to_string()];
        for (index, adapter) in adapters.iter().enumerate() {
            let adapter_info = adapter.get_info();
            let identifier = gpu_identifier(index);
            debug!(
                "Adapter '{}' on {:?} registered as {}",
                adapter_info.name, adapter_info.backend, identifier
            );
            devices.push(identifier);
        }

        Ok(devices)
    }
}

/// Hardware GPU adapters in enumeration order. Index `n` of the result is the
/// device listed as `gpu_identifier(n)`.
fn hardware_gpu_adapters(backends: wgpu::Backends) -> Vec<wgpu::Adapter> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    instance
        .enumerate_adapters(backends)
        .into_iter()
        .filter(|adapter| {
            let adapter_info = adapter.get_info();
            let keep = is_hardware_gpu(adapter_info.device_type);
            if !keep {
                debug!(
                    "Ignoring adapter '{}' ({:?})",
                    adapter_info.name, adapter_info.device_type
                );
            }
            keep
        })
        .collect()
}

fn gpu_identifier(index: usize) -> String {
    if index == 0 {
        "GPU".to_string()
    } else {
        format!("GPU.{}", index)
    }
}

fn is_hardware_gpu(device_type: wgpu::DeviceType) -> bool {
    matches!(
        device_type,
        wgpu::DeviceType::DiscreteGpu | wgpu::DeviceType::IntegratedGpu | wgpu::DeviceType::VirtualGpu
    )
}

/// Prints the enumerated devices, or a notice when there are none.
pub fn print_devices(devices: &[String]) {
    println!("Available devices:");
    if devices.is_empty() {
        println!("No devices found.");
    } else {
        for device in devices {
            println!("- {}", device);
        }
    }
}

/// A live GPU device held for the lifetime of one bound network.
///
/// Dropping the binding releases the device.
pub struct GpuBinding {
    adapter_name: String,
    _device: wgpu::Device,
    _queue: wgpu::Queue,
}

impl GpuBinding {
    /// Opens a device on the adapter listed as `"GPU"`.
    pub fn acquire() -> DeviceResult<Self> {
        Self::acquire_from(wgpu::Backends::all())
    }

    /// Opens a device on the first hardware GPU adapter of `backends`.
    pub fn acquire_from(backends: wgpu::Backends) -> DeviceResult<Self> {
        let adapter = hardware_gpu_adapters(backends)
            .into_iter()
            .next()
            .ok_or_else(|| DeviceError::QueryFailed {
                message: "no GPU adapter available".to_string(),
            })?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .block_on()
            .map_err(|e| DeviceError::QueryFailed {
                message: format!("failed to open '{}': {}", adapter_info.name, e),
            })?;

        info!("Bound GPU adapter '{}'", adapter_info.name);
        Ok(Self {
            adapter_name: adapter_info.name,
            _device: device,
            _queue: queue,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}

impl std::fmt::Debug for GpuBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBinding")
            .field("adapter_name", &self.adapter_name)
            .finish()
    }
}

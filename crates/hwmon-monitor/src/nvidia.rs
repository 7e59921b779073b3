//! NVIDIA GPU readings through NVML

use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;
use tracing::{info, warn};

use crate::provider::GpuReading;

pub struct NvidiaGpus {
    nvml: Nvml,
    count: u32,
}

impl NvidiaGpus {
    /// Initialize NVML. Returns `None` when the driver is missing.
    pub fn open() -> Option<Self> {
        let nvml = match Nvml::init() {
            Ok(nvml) => nvml,
            Err(e) => {
                warn!(error = %e, "NVML unavailable, NVIDIA GPUs will not be reported");
                return None;
            }
        };
        let count = nvml.device_count().unwrap_or(0);
        info!(gpus = count, "NVML initialized");
        Some(Self { nvml, count })
    }

    pub fn read(&self) -> Vec<GpuReading> {
        (0..self.count)
            .filter_map(|index| {
                let device = self.nvml.device_by_index(index).ok()?;
                let utilization = device.utilization_rates().ok();
                let memory = device.memory_info().ok();
                Some(GpuReading {
                    name: device
                        .name()
                        .unwrap_or_else(|_| format!("NVIDIA GPU {}", index)),
                    core_load: utilization.as_ref().map(|u| u.gpu as f32),
                    memory_load: memory
                        .as_ref()
                        .filter(|m| m.total > 0)
                        .map(|m| (m.used as f64 / m.total as f64 * 100.0) as f32),
                    temperature: device
                        .temperature(TemperatureSensor::Gpu)
                        .ok()
                        .map(|t| t as f32),
                    memory_used_bytes: memory.map(|m| m.used),
                })
            })
            .collect()
    }
}

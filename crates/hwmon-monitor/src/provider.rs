//! Live hardware provider built on sysinfo
//!
//! The tree mirrors a "computer" with CPU, GPU and memory groups enabled:
//!
//! ```text
//! /cpu/0          CPU       load/0 total, load/N core N, temperature/N
//! /ram            Memory    load/0 used %, data/0 used GiB, data/1 available GiB
//! /gpu-nvidia/N   GPU N     load/0 core, load/1 memory, temperature/0, data/0 used GiB
//! /sensors        Thermal   temperature/N for every other thermal component
//! ```

use hwmon_core::{HardwareNode, HardwareProvider, HardwareTree, ProviderError, SensorKind};
use std::time::Duration;
use sysinfo::{Components, CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, info};

#[cfg(feature = "nvidia")]
use crate::nvidia::NvidiaGpus;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// CPU usage is computed between two refreshes at least this far apart.
/// One-shot readers should refresh, wait this long, then refresh again.
pub const SETTLE_INTERVAL: Duration = sysinfo::MINIMUM_CPU_UPDATE_INTERVAL;

/// Raw readings of a GPU, as reported by its vendor library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuReading {
    pub name: String,
    pub core_load: Option<f32>,
    pub memory_load: Option<f32>,
    pub temperature: Option<f32>,
    pub memory_used_bytes: Option<u64>,
}

/// Plain readings a tree is built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub cpu_name: String,
    pub cpu_total: f32,
    pub cpu_cores: Vec<f32>,
    /// (label, degrees C) for every thermal component
    pub thermal: Vec<(String, f32)>,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_available: u64,
    pub gpus: Vec<GpuReading>,
}

fn is_cpu_package(label: &str) -> bool {
    let label = label.to_lowercase();
    label.contains("cpu") || label.contains("package") || label.contains("tctl")
}

fn is_cpu_core(label: &str) -> bool {
    label.to_lowercase().contains("core")
}

fn gib(bytes: u64) -> f32 {
    (bytes as f64 / BYTES_PER_GIB) as f32
}

/// Build the hardware tree from one set of readings.
///
/// CPU temperatures are package sensors, or per-core sensors when no
/// package sensor exists. All remaining thermal components go under `/sensors`.
pub fn build_tree(readings: &Readings) -> HardwareTree {
    let mut cpu = HardwareNode::new("/cpu/0", readings.cpu_name.as_str());
    cpu.push_sensor(SensorKind::Load, 0, "CPU Total", Some(readings.cpu_total));
    for (i, usage) in readings.cpu_cores.iter().enumerate() {
        cpu.push_sensor(SensorKind::Load, i + 1, format!("CPU Core #{}", i + 1), Some(*usage));
    }

    let mut cpu_labels: Vec<&str> = readings
        .thermal
        .iter()
        .map(|(label, _)| label.as_str())
        .filter(|label| is_cpu_package(label))
        .collect();
    if cpu_labels.is_empty() {
        cpu_labels = readings
            .thermal
            .iter()
            .map(|(label, _)| label.as_str())
            .filter(|label| is_cpu_core(label))
            .collect();
    }

    let mut thermal = HardwareNode::new("/sensors", "Thermal Sensors");
    for (label, temperature) in &readings.thermal {
        if cpu_labels.contains(&label.as_str()) {
            let index = cpu.sensors.iter().filter(|s| s.kind == SensorKind::Temperature).count();
            cpu.push_sensor(SensorKind::Temperature, index, label.as_str(), Some(*temperature));
        } else {
            let index = thermal.sensors.len();
            thermal.push_sensor(SensorKind::Temperature, index, label.as_str(), Some(*temperature));
        }
    }

    let mut memory = HardwareNode::new("/ram", "Generic Memory");
    let load = if readings.memory_total > 0 {
        Some((readings.memory_used as f64 / readings.memory_total as f64 * 100.0) as f32)
    } else {
        None
    };
    memory.push_sensor(SensorKind::Load, 0, "Memory", load);
    memory.push_sensor(SensorKind::Data, 0, "Memory Used", Some(gib(readings.memory_used)));
    memory.push_sensor(SensorKind::Data, 1, "Memory Available", Some(gib(readings.memory_available)));

    let mut roots = vec![cpu, memory];
    for (i, gpu) in readings.gpus.iter().enumerate() {
        let mut node = HardwareNode::new(format!("/gpu-nvidia/{}", i), gpu.name.as_str());
        node.push_sensor(SensorKind::Load, 0, "GPU Core", gpu.core_load);
        node.push_sensor(SensorKind::Load, 1, "GPU Memory", gpu.memory_load);
        node.push_sensor(SensorKind::Temperature, 0, "GPU Core", gpu.temperature);
        node.push_sensor(SensorKind::Data, 0, "GPU Memory Used", gpu.memory_used_bytes.map(gib));
        roots.push(node);
    }
    if !thermal.sensors.is_empty() {
        roots.push(thermal);
    }

    HardwareTree::new(roots)
}

/// Provider reading CPU, memory and thermal data from sysinfo, and NVIDIA
/// GPUs through NVML when built with the `nvidia` feature.
pub struct SysinfoProvider {
    system: System,
    components: Components,
    #[cfg(feature = "nvidia")]
    gpus: Option<NvidiaGpus>,
}

impl SysinfoProvider {
    /// Open the provider and take an initial reading
    pub fn open() -> Result<Self, ProviderError> {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );
        if system.cpus().is_empty() {
            return Err(ProviderError::Unavailable("no CPUs reported".to_string()));
        }
        let components = Components::new_with_refreshed_list();

        info!(
            cpus = system.cpus().len(),
            thermal = components.len(),
            "Hardware provider opened"
        );

        Ok(Self {
            system,
            components,
            #[cfg(feature = "nvidia")]
            gpus: NvidiaGpus::open(),
        })
    }

    fn read(&self) -> Readings {
        let cpus = self.system.cpus();
        Readings {
            cpu_name: cpus
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty())
                .unwrap_or_else(|| "CPU".to_string()),
            cpu_total: self.system.global_cpu_usage(),
            cpu_cores: cpus.iter().map(|cpu| cpu.cpu_usage()).collect(),
            thermal: self
                .components
                .iter()
                .map(|c| (c.label().to_string(), c.temperature()))
                .collect(),
            memory_total: self.system.total_memory(),
            memory_used: self.system.used_memory(),
            memory_available: self.system.available_memory(),
            gpus: self.read_gpus(),
        }
    }

    #[cfg(feature = "nvidia")]
    fn read_gpus(&self) -> Vec<GpuReading> {
        self.gpus.as_ref().map(NvidiaGpus::read).unwrap_or_default()
    }

    #[cfg(not(feature = "nvidia"))]
    fn read_gpus(&self) -> Vec<GpuReading> {
        Vec::new()
    }
}

impl HardwareProvider for SysinfoProvider {
    fn refresh(&mut self) -> Result<HardwareTree, ProviderError> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.components.refresh();
        Ok(build_tree(&self.read()))
    }

    fn close(&mut self) {
        #[cfg(feature = "nvidia")]
        {
            self.gpus = None;
        }
        debug!("Hardware provider closed");
    }
}

//! Compute device selection for the sequence model.

use candle_core::Device;
use serde::{Deserialize, Serialize};

/// Requested compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA > Metal > CPU, limited to the backends compiled in.
    #[default]
    Auto,
    /// Always run on the CPU.
    Cpu,
}

/// Resolve a [`DevicePreference`] into a concrete device.
///
/// GPU backends are only probed when the crate is built with the `cuda` or
/// `metal` feature; otherwise this always returns [`Device::Cpu`].
pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Cpu {
        return Device::Cpu;
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            tracing::info!("Sequence model on CUDA device 0");
            return device;
        }
        tracing::warn!("CUDA feature enabled but no GPU available, falling back");
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            tracing::info!("Sequence model on Metal device 0");
            return device;
        }
        tracing::warn!("Metal feature enabled but no device available, falling back");
    }

    Device::Cpu
}

use candle_core::Device;

/// Pick the compute device named in settings, falling back to CPU when the
/// accelerator is unavailable or not compiled in.
pub fn select_device(preferred: &str) -> Device {
    match preferred {
        #[cfg(feature = "metal")]
        "metal" => {
            if let Ok(dev) = Device::new_metal(0) { tracing::info!("Device: Metal (MPS)"); return dev; }
            tracing::warn!("Metal device unavailable, falling back to CPU");
        }
        #[cfg(feature = "cuda")]
        "cuda" => {
            if let Ok(dev) = Device::new_cuda(0) { tracing::info!("Device: CUDA"); return dev; }
            tracing::warn!("CUDA device unavailable, falling back to CPU");
        }
        "cpu" => {}
        other => tracing::warn!(device = other, "Device not compiled in, using CPU"),
    }
    tracing::info!("Device: CPU");
    Device::Cpu
}

//! Concrete compute backends.
//!
//! Every data engine and the sampler kernel are generic over
//! `burn::tensor::backend::Backend`; this module pins down the concrete
//! backends a build can enumerate and hands them to the engine registry.
//! The `cpu` feature (default) builds on ndarray and needs no hardware;
//! `gpu` builds on WGPU, which resolves to Metal, Vulkan or DX12 at
//! runtime depending on the platform.

use crate::engine::{register_engine, Engine};

#[cfg(feature = "cpu")]
pub use burn::backend::ndarray::NdArrayDevice;

#[cfg(feature = "cpu")]
pub type CpuBackend = burn::backend::NdArray;

/// CPU backend computing in f64, for callers that trade throughput for
/// precision. The engine registry treats it as the same CPU engine.
#[cfg(feature = "cpu")]
pub type CpuBackend64 = burn::backend::NdArray<f64>;

/// The CPU device. Works everywhere; the default for development, tests
/// and machines without a GPU.
#[cfg(feature = "cpu")]
pub fn init_cpu_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

#[cfg(feature = "gpu")]
pub use burn::backend::wgpu::WgpuDevice;

#[cfg(feature = "gpu")]
pub type WgpuBackend = burn::backend::Wgpu;

/// The default WGPU device.
#[cfg(feature = "gpu")]
pub fn init_gpu_device() -> WgpuDevice {
    WgpuDevice::default()
}

/// Names of the compiled-in backends, GPU variants first.
pub fn available_backends() -> Vec<&'static str> {
    let mut names = Vec::new();

    #[cfg(all(feature = "gpu", target_os = "macos"))]
    names.push("wgpu-metal");
    #[cfg(all(feature = "gpu", target_os = "linux"))]
    names.push("wgpu-vulkan");
    #[cfg(all(feature = "gpu", target_os = "windows"))]
    names.push("wgpu-dx12");

    #[cfg(feature = "cpu")]
    names.push("cpu-ndarray");

    names
}

/// Register an engine for every compiled-in backend.
///
/// The CPU engine is always present; a GPU build contributes one WGPU
/// engine, which outranks the CPU in the registry's priority order.
/// Call once at startup; re-registration of a known name is a no-op.
pub fn register_available_engines() {
    #[cfg(feature = "cpu")]
    register_engine(Engine::local_cpu());

    #[cfg(feature = "gpu")]
    register_engine(Engine::gpu(0));
}

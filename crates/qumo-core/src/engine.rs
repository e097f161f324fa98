//! Process-wide compute engine registry.
//!
//! Engines describe where batched work runs. The local CPU engine is
//! registered on first use at priority 1000; GPU engines register
//! themselves at priority 200 during backend initialization, one entry per
//! detected device. A *lower* priority value wins, so any registered GPU is
//! preferred over the CPU fallback.
//!
//! The registry and the "current engine" selection are process-wide mutable
//! state, guarded by a `Mutex` behind a one-shot `OnceLock` initializer.

use crate::error::{QumoError, Result};
use crate::estimate::max_cpu_threads;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

/// Where an engine dispatches its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Cpu,
    Gpu { device_index: usize },
}

/// A compute engine: a backend handle description plus scheduling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    pub name: String,
    pub kind: EngineKind,
    pub priority: u32,
}

impl Engine {
    /// The always-available CPU engine, priority 1000.
    pub fn local_cpu() -> Self {
        Engine {
            name: "LocalCPU".to_string(),
            kind: EngineKind::Cpu,
            priority: 1000,
        }
    }

    /// A GPU engine for one detected device, priority 200.
    pub fn gpu(device_index: usize) -> Self {
        Engine {
            name: format!("GPU:{device_index}"),
            kind: EngineKind::Gpu { device_index },
            priority: 200,
        }
    }

    /// Batch width that keeps this engine busy for a problem of size `n`.
    ///
    /// The GPU curve was fit empirically on dense matmul throughput; the
    /// CPU constant keeps per-batch overhead small relative to the kernel.
    pub fn optimal_batch_size(&self, n: usize) -> usize {
        match self.kind {
            EngineKind::Cpu => 100,
            EngineKind::Gpu { .. } => {
                let b = (6.0e7 * (n.max(1) as f64).powf(-1.381)).ceil();
                (b as usize).max(1)
            }
        }
    }

    /// Worker-pool width for this engine: GPU work is device-serialized on
    /// a single worker, CPU work fans out over the available cores.
    pub fn worker_count(&self) -> usize {
        match self.kind {
            EngineKind::Cpu => max_cpu_threads(),
            EngineKind::Gpu { .. } => 1,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

struct Registry {
    engines: IndexMap<String, Engine>,
    current: Option<String>,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let cpu = Engine::local_cpu();
        let mut engines = IndexMap::new();
        engines.insert(cpu.name.clone(), cpu);
        Mutex::new(Registry {
            engines,
            current: None,
        })
    })
}

/// All registered engines, in insertion order.
pub fn engines() -> Vec<Engine> {
    registry()
        .lock()
        .expect("engine registry poisoned")
        .engines
        .values()
        .cloned()
        .collect()
}

/// Register an engine. Backend initializers call this once per device;
/// a name already present keeps its first registration.
pub fn register_engine(engine: Engine) {
    let mut reg = registry().lock().expect("engine registry poisoned");
    reg.engines.entry(engine.name.clone()).or_insert(engine);
}

/// The highest-priority engine (lowest priority value, ties broken by
/// insertion order).
pub fn best_engine() -> Result<Engine> {
    let reg = registry().lock().expect("engine registry poisoned");
    reg.engines
        .values()
        .min_by_key(|e| e.priority)
        .cloned()
        .ok_or(QumoError::NoEngines)
}

/// The process-wide engine selection; defaults to [`best_engine`] until
/// [`set_current_engine`] is called.
pub fn current_engine() -> Result<Engine> {
    let reg = registry().lock().expect("engine registry poisoned");
    if let Some(name) = &reg.current {
        if let Some(e) = reg.engines.get(name) {
            return Ok(e.clone());
        }
    }
    reg.engines
        .values()
        .min_by_key(|e| e.priority)
        .cloned()
        .ok_or(QumoError::NoEngines)
}

/// Select the process-wide current engine by name.
pub fn set_current_engine(engine: &Engine) -> Result<()> {
    let mut reg = registry().lock().expect("engine registry poisoned");
    if reg.engines.contains_key(&engine.name) {
        reg.current = Some(engine.name.clone());
        Ok(())
    } else {
        Err(QumoError::NoEngines)
    }
}

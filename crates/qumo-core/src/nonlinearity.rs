//! Element-wise non-linearities applied to the binary block of the state.
//!
//! Three built-ins cover the solver dialects:
//! - `Sign`: `+1` if `x > 0`, `-1` if `x < 0`, `0` at zero
//! - `Tanh`
//! - `StepHalf`: `1.0` iff `x > 0.5`, else `0.0`
//!
//! Custom scalar maps can be *declared* at module-load time and are
//! *materialized* by a one-time [`init`]. The two-step registration lets
//! optional backends contribute specialized kernels after declarations have
//! been collected but before any sampling starts. Registration is
//! exactly-once across threads (spin on an atomic flag plus a mutex-held
//! table).

use crate::error::{QumoError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

type ScalarMap = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

struct CustomRegistry {
    declared: Vec<(String, ScalarMap)>,
    materialized: HashMap<String, ScalarMap>,
}

fn custom_registry() -> &'static Mutex<CustomRegistry> {
    static REGISTRY: OnceLock<Mutex<CustomRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(CustomRegistry {
            declared: Vec::new(),
            materialized: HashMap::new(),
        })
    })
}

static EXPANDED: AtomicBool = AtomicBool::new(false);

/// Declare a custom scalar non-linearity under `name`.
///
/// Must happen before [`init`]; later declarations are rejected so no
/// sampler can observe a half-registered family.
pub fn declare(name: impl Into<String>, f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Result<()> {
    if EXPANDED.load(Ordering::Acquire) {
        return Err(QumoError::InvalidRange(
            "non-linearity registry already materialized".to_string(),
        ));
    }
    let mut reg = custom_registry().lock().expect("nonlinearity registry poisoned");
    reg.declared.push((name.into(), Arc::new(f)));
    Ok(())
}

/// Materialize all declared non-linearities. Exactly one caller performs
/// the expansion; every other concurrent or later call is a no-op.
pub fn init() {
    if EXPANDED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return;
    }
    let mut reg = custom_registry().lock().expect("nonlinearity registry poisoned");
    let declared = std::mem::take(&mut reg.declared);
    for (name, f) in declared {
        reg.materialized.insert(name, f);
    }
}

fn lookup(name: &str) -> Option<ScalarMap> {
    let reg = custom_registry().lock().expect("nonlinearity registry poisoned");
    reg.materialized.get(name).cloned()
}

/// An element-wise map over trajectory state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nonlinearity {
    Sign,
    Tanh,
    StepHalf,
    /// A registered custom map, resolved by name at apply time.
    Custom(String),
}

impl Nonlinearity {
    /// Apply the map element-wise. Built-ins run on the device; custom
    /// maps round-trip through the host.
    pub fn apply<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            // +1 / 0 / -1 from the two strict comparisons
            Nonlinearity::Sign => {
                x.clone().greater_elem(0.0).float() - x.lower_elem(0.0).float()
            }
            Nonlinearity::Tanh => x.tanh(),
            Nonlinearity::StepHalf => x.greater_elem(0.5).float(),
            Nonlinearity::Custom(name) => {
                let f = lookup(name).unwrap_or_else(|| {
                    panic!("non-linearity {name:?} not materialized; call init() first")
                });
                let [rows, cols] = x.dims();
                let device = x.device();
                let data: Vec<f32> = x
                    .into_data()
                    .iter::<f64>()
                    .map(|v| f(v) as f32)
                    .collect();
                Tensor::<B, 1>::from_floats(data.as_slice(), &device)
                    .reshape([rows as i32, cols as i32])
            }
        }
    }

    /// Scalar form, used by host-side loops and tests.
    pub fn apply_scalar(&self, v: f64) -> f64 {
        match self {
            Nonlinearity::Sign => {
                if v > 0.0 {
                    1.0
                } else if v < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Nonlinearity::Tanh => v.tanh(),
            Nonlinearity::StepHalf => {
                if v > 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Nonlinearity::Custom(name) => {
                let f = lookup(name).unwrap_or_else(|| {
                    panic!("non-linearity {name:?} not materialized; call init() first")
                });
                f(v)
            }
        }
    }
}

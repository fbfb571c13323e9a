//! Effect registry for creating effects from string identifiers.

use crate::effects::register_builtin_effects;
use crate::{EffectModule, EffectsError, Result, SpectralEffect};
use parking_lot::RwLock;
use spectra_core::WaitMechanism;
use std::collections::HashMap;
use std::sync::Arc;

/// Create an [`EffectParams`] map with key-value pairs.
///
/// # Example
/// ```ignore
/// let params = effect_params! {
///     "low_hz" => 200.0,
///     "reject" => true,
/// };
/// ```
#[macro_export]
macro_rules! effect_params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::EffectParams::new();
        $(
            map.insert($key.to_string(), $crate::registry::ParamValue::from($value));
        )*
        map
    }};
}

/// Function that constructs an effect with default parameters.
pub type EffectConstructor = Arc<dyn Fn() -> Box<dyn SpectralEffect> + Send + Sync>;

/// Initial parameter values (simple key-value map).
pub type EffectParams = HashMap<String, ParamValue>;

/// Initial parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
}

impl ParamValue {
    /// Value as stored by the module; toggles map to 0 or 1.
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Float(value) => value,
            Self::Bool(value) => f32::from(u8::from(value)),
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value as f32)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Float(value as f32)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Shared table of effect constructors. Clones share registrations.
#[derive(Clone)]
pub struct EffectRegistry {
    constructors: Arc<RwLock<HashMap<String, EffectConstructor>>>,
}

impl EffectRegistry {
    /// Registry without any effects.
    pub fn new() -> Self {
        Self {
            constructors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register (or replace) an effect constructor.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn SpectralEffect> + Send + Sync + 'static,
    {
        self.constructors
            .write()
            .insert(name.into(), Arc::new(constructor));
    }

    /// Create an effect with its default parameters.
    pub fn create(&self, name: &str) -> Result<Box<dyn SpectralEffect>> {
        let constructors = self.constructors.read();
        let constructor = constructors
            .get(name)
            .ok_or_else(|| EffectsError::UnknownEffect(name.to_string()))?;
        Ok(constructor())
    }

    /// Create a module around a new effect, applying `params` on top of the
    /// defaults.
    pub fn create_module(
        &self,
        name: &str,
        params: &EffectParams,
        max_bins: usize,
        mechanism: WaitMechanism,
    ) -> Result<EffectModule> {
        let effect = self.create(name)?;
        let module = EffectModule::new(effect, max_bins, mechanism);
        for (id, value) in params {
            module.parameters().set(id, value.as_f32())?;
        }
        Ok(module)
    }

    /// List all registered effect types.
    pub fn list_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.constructors.read().contains_key(name)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.constructors.write().remove(name).is_some()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        let registry = Self::new();
        register_builtin_effects(&registry);
        registry
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}

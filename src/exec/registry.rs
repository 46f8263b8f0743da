// src/exec/registry.rs

//! Test-registration state.
//!
//! Script executors record the specs a file declares into a [`SpecRegistry`].
//! The runner never shares one registry between concurrent executions: every
//! execution slot asks the [`RegistryFactory`] for an instance and resets it
//! before and after use.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// A spec declared while executing a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSpec {
    pub context_path: Vec<String>,
    pub description: String,
    pub tags: Vec<String>,
}

pub trait SpecRegistry: Send + Sync + Debug {
    fn register(&self, spec: DeclaredSpec);
    fn declared(&self) -> Vec<DeclaredSpec>;
    /// Drop every declaration accumulated so far.
    fn reset(&self);
}

pub trait RegistryFactory: Send + Sync {
    fn create(&self) -> Arc<dyn SpecRegistry>;
}

impl<F> RegistryFactory for F
where
    F: Fn() -> Arc<dyn SpecRegistry> + Send + Sync,
{
    fn create(&self) -> Arc<dyn SpecRegistry> {
        self()
    }
}

/// Plain mutex-backed registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    specs: Mutex<Vec<DeclaredSpec>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpecRegistry for InMemoryRegistry {
    fn register(&self, spec: DeclaredSpec) {
        if let Ok(mut specs) = self.specs.lock() {
            specs.push(spec);
        }
    }

    fn declared(&self) -> Vec<DeclaredSpec> {
        self.specs.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn reset(&self) {
        if let Ok(mut specs) = self.specs.lock() {
            specs.clear();
        }
    }
}

/// Hands out a fresh [`InMemoryRegistry`] per execution.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreshRegistries;

impl RegistryFactory for FreshRegistries {
    fn create(&self) -> Arc<dyn SpecRegistry> {
        Arc::new(InMemoryRegistry::new())
    }
}

/// Resets the registry when dropped, so cleanup also happens if the
/// execution future is dropped or panics.
pub(crate) struct ResetOnDrop<'a> {
    registry: &'a dyn SpecRegistry,
}

impl<'a> ResetOnDrop<'a> {
    pub(crate) fn new(registry: &'a dyn SpecRegistry) -> Self {
        Self { registry }
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.registry.reset();
    }
}

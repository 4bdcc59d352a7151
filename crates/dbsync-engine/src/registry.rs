//! Handle registry: a generation-checked arena of live instances.
//!
//! ## Invariants
//!
//! - A `Handle` resolves only while its slot holds an instance minted
//!   with the same generation.
//! - Releasing a slot bumps its generation, so stale handles fail with
//!   `InvalidHandle` even after the slot is reused.
//! - The registry lock covers slot bookkeeping only; storage is opened and
//!   closed outside it.

#![allow(clippy::result_large_err)]

use crate::config::SyncOptions;
use crate::instance::{Instance, LogSink};
use dbsync_core::errors::{ExError, ExErrorKind};
use dbsync_core::model::{DbEngineType, HostType};
use dbsync_core::{log_op_end, log_op_error, log_op_start};
use dbsync_store::errors::Result;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Caller-visible identifier of one live instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a single integer. Zero is never a valid handle.
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    instance: Option<Arc<Instance>>,
}

#[derive(Default)]
struct Slots {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Slots {
    fn insert(&mut self, instance: Arc<Instance>) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.instance = Some(instance);
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            instance: Some(instance),
        });
        Handle {
            index,
            generation: 1,
        }
    }

    fn get(&self, handle: Handle) -> Option<&Arc<Instance>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.instance.as_ref())
    }

    fn remove(&mut self, handle: Handle) -> Option<Arc<Instance>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let instance = slot.instance.take()?;
        // generation 0 is reserved so that raw handle 0 never resolves
        slot.generation = slot.generation.checked_add(1).unwrap_or(1);
        self.free.push(handle.index);
        Some(instance)
    }

    fn live_handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.instance.is_some())
            .map(|(index, slot)| Handle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }
}

fn invalid_handle(handle: Handle) -> ExError {
    ExError::new(ExErrorKind::InvalidHandle)
        .with_handle(handle.to_string())
        .with_message(format!("Handle {} is not live", handle))
}

/// Process-wide table of live handles
#[derive(Default)]
pub struct Registry {
    slots: Mutex<Slots>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a handle for `schema_ddl` stored at `storage_path`
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `storage_path` or `schema_ddl` is empty
    /// - `SchemaError` if the schema is invalid or conflicts with the store
    /// - `StorageError` if the store cannot be opened
    pub fn initialize(
        &self,
        host: HostType,
        engine: DbEngineType,
        storage_path: &str,
        schema_ddl: &str,
        options: SyncOptions,
        log_sink: Option<LogSink>,
    ) -> Result<Handle> {
        log_op_start!("initialize", host = %host, engine = %engine);
        let start = std::time::Instant::now();

        let result = self
            .initialize_impl(host, engine, storage_path, schema_ddl, options, log_sink)
            .map_err(|e| {
                let e = e.with_op("initialize");
                log_op_error!(
                    "initialize",
                    e,
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "initialize",
            duration_ms = start.elapsed().as_millis() as u64,
            handle = %result
        );
        Ok(result)
    }

    fn initialize_impl(
        &self,
        host: HostType,
        engine: DbEngineType,
        storage_path: &str,
        schema_ddl: &str,
        options: SyncOptions,
        log_sink: Option<LogSink>,
    ) -> Result<Handle> {
        if storage_path.trim().is_empty() {
            return Err(ExError::new(ExErrorKind::InvalidArgument)
                .with_message("storage path is required"));
        }
        if schema_ddl.trim().is_empty() {
            return Err(ExError::new(ExErrorKind::InvalidArgument)
                .with_message("schema is required"));
        }

        let instance = Instance::open(host, engine, Path::new(storage_path), schema_ddl, options)?;
        instance.set_log_sink(log_sink);

        Ok(self.slots().insert(Arc::new(instance)))
    }

    /// Resolve a handle
    ///
    /// # Errors
    ///
    /// `InvalidHandle` for unknown, released or torn-down handles.
    pub fn get(&self, handle: Handle) -> Result<Arc<Instance>> {
        self.slots()
            .get(handle)
            .cloned()
            .ok_or_else(|| invalid_handle(handle))
    }

    /// Close one handle
    ///
    /// The connection closes once in-flight calls holding the instance
    /// return.
    pub fn release(&self, handle: Handle) -> Result<()> {
        let instance = self
            .slots()
            .remove(handle)
            .ok_or_else(|| invalid_handle(handle).with_op("release"))?;
        drop(instance);
        tracing::debug!(handle = %handle, "Released handle");
        Ok(())
    }

    /// Close every handle. Idempotent.
    pub fn teardown(&self) {
        let released: Vec<Arc<Instance>> = {
            let mut slots = self.slots();
            slots
                .live_handles()
                .into_iter()
                .filter_map(|handle| slots.remove(handle))
                .collect()
        };
        tracing::debug!(count = released.len(), "Tore down registry");
    }

    /// Set or replace the failure sink of one handle
    pub fn attach_log_sink(&self, handle: Handle, sink: LogSink) -> Result<()> {
        self.get(handle)
            .map_err(|e| e.with_op("attach_log_sink"))?
            .set_log_sink(Some(sink));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots().live_handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry used by [`crate::boundary`]
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory(registry: &Registry) -> Handle {
        registry
            .initialize(
                HostType::Agent,
                DbEngineType::InMemory,
                "mem",
                "files(path TEXT PRIMARY KEY, size INT)",
                SyncOptions::default(),
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_handle_raw_round_trip() {
        let handle = Handle {
            index: 7,
            generation: 3,
        };
        assert_eq!(Handle::from_raw(handle.to_raw()), handle);
        assert_eq!(handle.to_string(), "7v3");
    }

    #[test]
    fn test_released_handle_is_stale_after_reuse() {
        let registry = Registry::new();
        let first = in_memory(&registry);
        registry.release(first).unwrap();

        let second = in_memory(&registry);
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());

        let err = registry.get(first).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidHandle);
        assert!(registry.get(second).is_ok());
        assert_eq!(
            registry.release(first).unwrap_err().kind(),
            ExErrorKind::InvalidHandle
        );
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let registry = Registry::new();
        let a = in_memory(&registry);
        let b = in_memory(&registry);
        assert_eq!(registry.len(), 2);

        registry.teardown();
        registry.teardown();

        assert!(registry.is_empty());
        assert!(registry.get(a).is_err());
        assert!(registry.get(b).is_err());
    }

    #[test]
    fn test_raw_zero_never_resolves() {
        let registry = Registry::new();
        in_memory(&registry);
        assert!(registry.get(Handle::from_raw(0)).is_err());
    }

    #[test]
    fn test_empty_arguments_rejected() {
        let registry = Registry::new();
        for (path, ddl) in [("", "t(a INT PRIMARY KEY)"), ("mem", "  ")] {
            let err = registry
                .initialize(
                    HostType::Agent,
                    DbEngineType::InMemory,
                    path,
                    ddl,
                    SyncOptions::default(),
                    None,
                )
                .unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
        }
        assert!(registry.is_empty());
    }
}

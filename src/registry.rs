//! Registry of instrumented builder types.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Role a type plays in the builder chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderRole {
    Client,
    TableBuilder,
    FilterBuilder,
}

impl BuilderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuilderRole::Client => "client",
            BuilderRole::TableBuilder => "table_builder",
            BuilderRole::FilterBuilder => "filter_builder",
        }
    }
}

impl fmt::Display for BuilderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable identity of an instrumentable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId {
    type_id: TypeId,
    type_name: &'static str,
}

impl TargetId {
    /// Identity of the type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Identity of the type of `value`.
    pub fn of_val<T: 'static>(_value: &T) -> Self {
        Self::of::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A registry entry: one type and the methods wrapped on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedTarget {
    pub id: TargetId,
    pub role: BuilderRole,
    pub methods: Vec<&'static str>,
}

/// Records which builder types have been instrumented.
///
/// Each type is registered at most once; registering it again is a no-op.
/// Wrappers consult the registry on every call, so [`restore`](Self::restore)
/// turns every existing wrapper back into a plain pass-through.
///
/// Integrations own a registry each by default. Share one through
/// [`IntegrationBuilder::registry`](crate::IntegrationBuilder::registry) to
/// have several integrations instrument a client type only once.
#[derive(Debug, Default)]
pub struct InstrumentationRegistry {
    entries: Mutex<HashMap<TypeId, InstrumentedTarget>>,
}

impl InstrumentationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<TypeId, InstrumentedTarget>> {
        // Entries are plain data, a poisoned lock leaves them consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `id` with the methods wrapped on it.
    ///
    /// Returns `false` if the type was already instrumented.
    pub fn instrument(&self, id: TargetId, role: BuilderRole, methods: &[&'static str]) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(&id.type_id) {
            return false;
        }

        entries.insert(
            id.type_id,
            InstrumentedTarget {
                id,
                role,
                methods: methods.to_vec(),
            },
        );

        tracing::debug!(
            role = %role,
            type_name = id.type_name,
            methods = ?methods,
            "Instrumented builder type"
        );
        true
    }

    pub fn is_instrumented(&self, id: TargetId) -> bool {
        self.entries().contains_key(&id.type_id)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.is_instrumented(TargetId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Snapshot of every registered target.
    pub fn targets(&self) -> Vec<InstrumentedTarget> {
        self.entries().values().cloned().collect()
    }

    /// Unregister every target, returning what was removed.
    ///
    /// Not meant to run while requests are in flight: a request that already
    /// passed its checks is still observed.
    pub fn restore(&self) -> Vec<InstrumentedTarget> {
        let restored: Vec<_> = self.entries().drain().map(|(_, target)| target).collect();

        for target in &restored {
            tracing::debug!(
                role = %target.role,
                type_name = target.id.type_name,
                methods = ?target.methods,
                "Restored builder type"
            );
        }

        restored
    }
}

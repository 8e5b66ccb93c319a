//! Dependency scopes for work items
//!
//! A [`ServiceProvider`] holds the process-wide singletons (HTTP client,
//! credential store, factories) and the constructors of scoped services.
//! Every executed work item gets its own [`ServiceScope`]: singletons are
//! shared, scoped services are built at most once per scope and dropped with it.

use crate::error::{Error, Result};
use crate::types::ScopeId;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type AnyService = Arc<dyn Any + Send + Sync>;
type ScopedConstructor = Arc<dyn Fn(&ServiceScope) -> Result<AnyService> + Send + Sync>;

/// Builder for a [`ServiceProvider`]
#[derive(Default)]
pub struct ServiceProviderBuilder {
    singletons: HashMap<TypeId, AnyService>,
    scoped: HashMap<TypeId, ScopedConstructor>,
}

impl ServiceProviderBuilder {
    /// Register a value shared by every scope
    ///
    /// Registering the same type twice keeps the last value.
    #[must_use]
    pub fn singleton<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.singletons.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Register a constructor run once per scope on first resolution
    #[must_use]
    pub fn scoped<T, F>(mut self, constructor: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Result<T> + Send + Sync + 'static,
    {
        let constructor: ScopedConstructor =
            Arc::new(move |scope| Ok(Arc::new(constructor(scope)?) as AnyService));
        self.scoped.insert(TypeId::of::<T>(), constructor);
        self
    }

    /// Finish building
    pub fn build(self) -> Arc<ServiceProvider> {
        Arc::new(ServiceProvider {
            singletons: self.singletons,
            scoped: self.scoped,
            next_scope: AtomicU64::new(1),
        })
    }
}

/// Root container that creates per-execution scopes
pub struct ServiceProvider {
    singletons: HashMap<TypeId, AnyService>,
    scoped: HashMap<TypeId, ScopedConstructor>,
    next_scope: AtomicU64,
}

impl ServiceProvider {
    /// Start building a provider
    pub fn builder() -> ServiceProviderBuilder {
        ServiceProviderBuilder::default()
    }

    /// Create a fresh scope with a process-unique id
    pub fn create_scope(self: &Arc<Self>) -> ServiceScope {
        let id = ScopeId(self.next_scope.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(scope_id = %id, "scope created");
        ServiceScope {
            id,
            provider: Arc::clone(self),
            instances: Mutex::new(HashMap::new()),
        }
    }
}

/// Per-execution dependency scope
pub struct ServiceScope {
    id: ScopeId,
    provider: Arc<ServiceProvider>,
    instances: Mutex<HashMap<TypeId, AnyService>>,
}

impl ServiceScope {
    /// Identifier of this scope
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Resolve a service by type
    ///
    /// Singletons are returned as registered. Scoped services are built on
    /// first use and the same instance is returned for the rest of the scope.
    ///
    /// # Errors
    /// [`Error::ServiceNotRegistered`] when nothing is registered for `T`,
    /// or whatever the scoped constructor returns
    pub fn resolve<T>(&self) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = TypeId::of::<T>();

        if let Some(service) = self.provider.singletons.get(&key) {
            return downcast::<T>(service);
        }

        let Some(constructor) = self.provider.scoped.get(&key) else {
            return Err(Error::ServiceNotRegistered(type_name::<T>()));
        };

        if let Some(service) = self.lock_instances().get(&key) {
            return downcast::<T>(service);
        }

        // Built outside the lock so constructors can resolve their own dependencies
        let service = constructor(self)?;
        let service = self
            .lock_instances()
            .entry(key)
            .or_insert(service)
            .clone();
        downcast::<T>(&service)
    }

    fn lock_instances(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, AnyService>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope").field("id", &self.id).finish()
    }
}

fn downcast<T>(service: &AnyService) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    service
        .downcast_ref::<T>()
        .cloned()
        .ok_or(Error::ServiceNotRegistered(type_name::<T>()))
}

use crate::error::{ArmatureError, Result};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) type AnyInstance = Arc<dyn Any + Send + Sync>;
pub(crate) type BuildFn = Box<dyn Fn(&Deps<'_>) -> Result<AnyInstance> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct DepKey {
    pub(crate) id: TypeId,
    pub(crate) type_name: &'static str,
}

impl DepKey {
    pub(crate) fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

/// The dependencies resolved for one factory call.
///
/// Only types declared via [`Provider::depends_on`] are visible here; asking
/// for anything else is a configuration error.
pub struct Deps<'a> {
    resolved: &'a HashMap<TypeId, AnyInstance>,
    declared: &'a [DepKey],
}

impl<'a> Deps<'a> {
    pub(crate) fn new(resolved: &'a HashMap<TypeId, AnyInstance>, declared: &'a [DepKey]) -> Self {
        Self { resolved, declared }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let id = TypeId::of::<T>();
        if !self.declared.iter().any(|dep| dep.id == id) {
            return Err(ArmatureError::UndeclaredDependency {
                type_name: type_name::<T>().to_string(),
            });
        }
        let instance = self
            .resolved
            .get(&id)
            .ok_or_else(|| ArmatureError::ProviderNotFound {
                type_name: type_name::<T>().to_string(),
            })?;
        instance
            .clone()
            .downcast::<T>()
            .map_err(|_| ArmatureError::DowncastFailed {
                type_name: type_name::<T>().to_string(),
            })
    }
}

/// A factory plus the ordered list of dependencies it consumes.
///
/// ```
/// use armature::{Deps, Provider};
/// # struct MovieRepository;
/// # struct MovieService { repository: std::sync::Arc<MovieRepository> }
///
/// let repository = Provider::new(|_| Ok(MovieRepository));
/// let service = Provider::new(|deps: &Deps| {
///     Ok(MovieService { repository: deps.get::<MovieRepository>()? })
/// })
/// .depends_on::<MovieRepository>();
/// ```
pub struct Provider<T> {
    pub(crate) deps: Vec<DepKey>,
    pub(crate) build: BuildFn,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Provider<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Deps<'_>) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            deps: Vec::new(),
            build: Box::new(move |deps| Ok(Arc::new(factory(deps)?) as AnyInstance)),
            _marker: PhantomData,
        }
    }

    /// Declare a constructor dependency, in declaration order.
    pub fn depends_on<D: Send + Sync + 'static>(mut self) -> Self {
        self.deps.push(DepKey::of::<D>());
        self
    }
}

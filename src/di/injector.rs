use crate::controller::Controller;
use crate::di::provider::{AnyInstance, BuildFn, DepKey, Deps, Provider};
use crate::error::{ArmatureError, Result};
use dashmap::DashMap;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

/// A typed reference to a registered controller, kept in the app's
/// controllers list until resolution.
#[derive(Debug, Clone, Copy)]
pub struct ControllerRef {
    pub(crate) id: TypeId,
    pub(crate) type_name: &'static str,
}

impl ControllerRef {
    pub fn of<C: Controller + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
        }
    }
}

type CasterFn = Arc<dyn Fn(AnyInstance) -> Result<Arc<dyn Controller>> + Send + Sync>;

struct ProviderEntry {
    type_name: &'static str,
    deps: Vec<DepKey>,
    build: BuildFn,
}

/// The dependency injector.
///
/// Providers are registered with an explicit dependency list and resolved
/// recursively, bottom-up. The declared graph is checked for cycles before
/// any factory runs.
///
/// Instances are cached only within a single `resolve` call (a diamond graph
/// shares one instance per pass). There is no singleton scope across calls;
/// each resolution reconstructs the whole subgraph. A known limitation, kept
/// for predictability.
///
/// ```
/// use armature::{Injector, Provider};
/// # struct ConfigService;
/// # impl ConfigService { fn new() -> Self { Self } }
///
/// let mut injector = Injector::new();
/// injector.provide(Provider::new(|_| Ok(ConfigService::new())));
/// let config = injector.resolve::<ConfigService>().unwrap();
/// ```
pub struct Injector {
    providers: DashMap<TypeId, ProviderEntry>,
    controller_casters: DashMap<TypeId, CasterFn>,
}

impl Injector {
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
            controller_casters: DashMap::new(),
        }
    }

    pub fn provide<T: Send + Sync + 'static>(&mut self, provider: Provider<T>) -> &mut Self {
        self.providers.insert(
            TypeId::of::<T>(),
            ProviderEntry {
                type_name: type_name::<T>(),
                deps: provider.deps,
                build: provider.build,
            },
        );
        self
    }

    /// Register a controller provider. Besides the provider itself this
    /// records the cast to `Arc<dyn Controller>` the app composer uses to
    /// validate the controllers list.
    pub fn provide_controller<C>(&mut self, provider: Provider<C>) -> &mut Self
    where
        C: Controller + Send + Sync + 'static,
    {
        self.provide(provider);
        let caster: CasterFn = Arc::new(|instance| {
            instance
                .downcast::<C>()
                .map(|controller| controller as Arc<dyn Controller>)
                .map_err(|_| ArmatureError::DowncastFailed {
                    type_name: type_name::<C>().to_string(),
                })
        });
        self.controller_casters.insert(TypeId::of::<C>(), caster);
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<T>())
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let instance = self.resolve_any(DepKey::of::<T>())?;
        instance
            .downcast::<T>()
            .map_err(|_| ArmatureError::DowncastFailed {
                type_name: type_name::<T>().to_string(),
            })
    }

    pub fn resolve_controller(&self, reference: &ControllerRef) -> Result<Arc<dyn Controller>> {
        let caster = self
            .controller_casters
            .get(&reference.id)
            .map(|c| c.value().clone())
            .ok_or_else(|| ArmatureError::NotAController {
                type_name: reference.type_name.to_string(),
            })?;
        let instance = self.resolve_any(DepKey {
            id: reference.id,
            type_name: reference.type_name,
        })?;
        caster(instance)
    }

    fn resolve_any(&self, root: DepKey) -> Result<AnyInstance> {
        let mut path = Vec::new();
        self.check_cycles(root, &mut path)?;

        let mut cache = HashMap::new();
        self.construct(root, &mut cache)
    }

    /// Pure walk of the declared graph; no factory runs on a path that
    /// contains a cycle.
    fn check_cycles(&self, key: DepKey, path: &mut Vec<DepKey>) -> Result<()> {
        if let Some(start) = path.iter().position(|seen| seen.id == key.id) {
            let mut cycle: Vec<&str> = path[start..].iter().map(|dep| dep.type_name).collect();
            cycle.push(key.type_name);
            return Err(ArmatureError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        let deps = {
            let entry =
                self.providers
                    .get(&key.id)
                    .ok_or_else(|| ArmatureError::ProviderNotFound {
                        type_name: key.type_name.to_string(),
                    })?;
            entry.deps.clone()
        };

        path.push(key);
        for dep in deps {
            self.check_cycles(dep, path)?;
        }
        path.pop();
        Ok(())
    }

    fn construct(
        &self,
        key: DepKey,
        cache: &mut HashMap<TypeId, AnyInstance>,
    ) -> Result<AnyInstance> {
        if let Some(instance) = cache.get(&key.id) {
            return Ok(instance.clone());
        }

        let deps = {
            let entry =
                self.providers
                    .get(&key.id)
                    .ok_or_else(|| ArmatureError::ProviderNotFound {
                        type_name: key.type_name.to_string(),
                    })?;
            entry.deps.clone()
        };

        for dep in &deps {
            self.construct(*dep, cache)?;
        }

        let entry = self
            .providers
            .get(&key.id)
            .ok_or_else(|| ArmatureError::ProviderNotFound {
                type_name: key.type_name.to_string(),
            })?;
        let instance = {
            let view = Deps::new(cache, &deps);
            (entry.build)(&view)?
        };
        drop(entry);

        cache.insert(key.id, instance.clone());
        Ok(instance)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

//! Request context provider
//!
//! The engine never loads anything itself. Everything a rule can observe about
//! the current request (its action, parameters, preloaded resources, actors)
//! comes through [`Provider`].

use gatehouse_core::{Result, Value};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

/// Request-scoped source of actions, parameters, resources and actors
pub trait Provider {
    /// Name of the action being requested
    fn action_name(&self) -> &str;

    /// Request parameter
    fn param(&self, key: &str) -> Option<Value>;

    /// Resource loaded ahead of authorization
    fn resource(&self, name: &str) -> Option<Value>;

    /// Whether an actor of that name is known at all
    fn has_actor(&self, name: &str) -> bool;

    /// Resolve an actor, `None` when the actor is absent for this request
    fn actor(&self, name: &str) -> Result<Option<Value>>;
}

type ActorLoader = Box<dyn Fn() -> Result<Option<Value>>>;

struct ActorSlot {
    loader: Option<ActorLoader>,
    value: OnceCell<Option<Value>>,
}

impl ActorSlot {
    fn ready(value: Option<Value>) -> Self {
        let slot = Self {
            loader: None,
            value: OnceCell::new(),
        };
        let _ = slot.value.set(value);
        slot
    }

    fn lazy(loader: ActorLoader) -> Self {
        Self {
            loader: Some(loader),
            value: OnceCell::new(),
        }
    }

    fn get(&self) -> Result<Option<Value>> {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        let loaded = match &self.loader {
            Some(loader) => loader()?,
            None => None,
        };
        Ok(self.value.get_or_init(|| loaded).clone())
    }
}

/// In-memory provider for a single request
///
/// Actors can be given directly or through a loader that runs at most once,
/// the first time a rule asks for that actor.
#[derive(Default)]
pub struct RequestProvider {
    action: String,
    params: HashMap<String, Value>,
    resources: HashMap<String, Value>,
    actors: HashMap<String, ActorSlot>,
}

impl RequestProvider {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.resources.insert(name.into(), value.into());
        self
    }

    pub fn with_actor(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.actors
            .insert(name.into(), ActorSlot::ready(Some(value.into())));
        self
    }

    /// Register an actor slot that resolves to nothing, e.g. a guest
    pub fn with_absent_actor(mut self, name: impl Into<String>) -> Self {
        self.actors.insert(name.into(), ActorSlot::ready(None));
        self
    }

    /// Register an actor resolved on first use
    pub fn with_actor_loader<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Option<Value>> + 'static,
    {
        self.actors
            .insert(name.into(), ActorSlot::lazy(Box::new(loader)));
        self
    }

    /// Add a parameter in place
    pub fn insert_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    /// Add a resource in place
    pub fn insert_resource(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.resources.insert(name.into(), value.into());
    }

    /// Add an actor in place
    pub fn insert_actor(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.actors
            .insert(name.into(), ActorSlot::ready(Some(value.into())));
    }
}

impl fmt::Debug for RequestProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actors: Vec<_> = self.actors.keys().collect();
        actors.sort();
        f.debug_struct("RequestProvider")
            .field("action", &self.action)
            .field("params", &self.params)
            .field("resources", &self.resources)
            .field("actors", &actors)
            .finish()
    }
}

impl Provider for RequestProvider {
    fn action_name(&self) -> &str {
        &self.action
    }

    fn param(&self, key: &str) -> Option<Value> {
        self.params.get(key).cloned()
    }

    fn resource(&self, name: &str) -> Option<Value> {
        self.resources.get(name).cloned()
    }

    fn has_actor(&self, name: &str) -> bool {
        self.actors.contains_key(name)
    }

    fn actor(&self, name: &str) -> Result<Option<Value>> {
        match self.actors.get(name) {
            Some(slot) => slot.get(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{Error, Record};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_lazy_actor_loads_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let provider = RequestProvider::new("show").with_actor_loader("user", move || {
            counter.set(counter.get() + 1);
            Ok(Some(Record::new("User").with("id", 1).into()))
        });

        assert!(provider.has_actor("user"));
        assert!(provider.actor("user").unwrap().is_some());
        assert!(provider.actor("user").unwrap().is_some());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_loader_failure_surfaces() {
        let provider = RequestProvider::new("show")
            .with_actor_loader("user", || Err(Error::provider("session store down")));

        assert!(matches!(provider.actor("user"), Err(Error::Provider(_))));
    }

    #[test]
    fn test_absent_actor_is_known_but_empty() {
        let provider = RequestProvider::new("show").with_absent_actor("guest");

        assert!(provider.has_actor("guest"));
        assert!(provider.actor("guest").unwrap().is_none());
        assert!(!provider.has_actor("user"));
    }

    #[test]
    fn test_params_and_resources() {
        let mut provider = RequestProvider::new("index").with_param("page", "2");
        provider.insert_resource("app", Record::new("App"));

        assert_eq!(provider.action_name(), "index");
        assert_eq!(provider.param("page"), Some(Value::from("2")));
        assert!(provider.resource("app").is_some());
        assert!(provider.param("missing").is_none());
    }
}

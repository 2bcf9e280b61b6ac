//! Definition registry
//!
//! Holds every named test and profile. A definition is built once during
//! setup and then shared read-only by any number of concurrent validations.

use crate::context::kind::{Base, Kind};
use crate::context::{DefaultView, Tests, View};
use crate::dsl::{Profiles, Rules};
use crate::profile::{ActionSet, Decision, Upon, Validate};
use crate::provider::Provider;
use gatehouse_core::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Registry of named tests and profiles
///
/// Cloning shares the registered predicates and profiles.
#[derive(Clone, Default)]
pub struct Definition {
    profiles: Profiles,
    tests: Tests,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named test, usable from any rule through `happens`
    pub fn register_test<F>(&mut self, name: impl Into<String>, predicate: F) -> Result<()>
    where
        F: Fn(&DefaultView<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.tests.contains_key(&name) {
            return Err(Error::setup(format!("duplicated test identifier '{}'", name)));
        }
        self.tests.insert(name, Arc::new(predicate));
        Ok(())
    }

    /// Register a profile built from `build`
    pub fn register_profile<F>(&mut self, name: impl Into<String>, build: F) -> Result<()>
    where
        F: FnOnce(&mut Rules<'_, Base>) -> Result<()>,
    {
        let name = self.vacant(name.into())?;
        let mut rules = Rules::new(&self.profiles);
        build(&mut rules)?;
        let profile = Arc::new(rules.into_profile());
        self.insert_profile(name, profile)
    }

    /// Register a profile whose rules run inside a narrowed context
    ///
    /// The profile evaluates to `Default` for requests where `context` does
    /// not load.
    pub fn register_profile_upon<K, C, F>(
        &mut self,
        name: impl Into<String>,
        context: C,
        build: F,
    ) -> Result<()>
    where
        K: Kind,
        C: for<'a> Fn(&View<'a, Base>) -> Result<View<'a, K>> + Send + Sync + 'static,
        F: FnOnce(&mut Rules<'_, K>) -> Result<()>,
    {
        let name = self.vacant(name.into())?;
        let mut rules = Rules::new(&self.profiles);
        build(&mut rules)?;
        let profile = Arc::new(Upon::new(Arc::new(context), rules.into_profile()));
        self.insert_profile(name, profile)
    }

    pub(crate) fn insert_profile(
        &mut self,
        name: String,
        profile: Arc<dyn Validate<Base>>,
    ) -> Result<()> {
        let name = self.vacant(name)?;
        debug!(profile = %name, "registered profile");
        self.profiles.insert(name, profile);
        Ok(())
    }

    fn vacant(&self, name: String) -> Result<String> {
        if self.profiles.contains_key(&name) {
            return Err(Error::setup(format!(
                "duplicated profile identifier '{}'",
                name
            )));
        }
        Ok(name)
    }

    /// Evaluate a profile for the request behind `provider`
    pub fn validate(
        &self,
        provider: &dyn Provider,
        profile: &str,
        actions: impl Into<ActionSet>,
    ) -> Result<Decision> {
        let validator = self
            .profiles
            .get(profile)
            .ok_or_else(|| Error::setup(format!("profile not found '{}'", profile)))?;
        let actions = actions.into();
        let root = View::root(provider, &self.tests);
        let decision = validator.validate(&root, &actions)?;

        debug!(profile, %actions, %decision, "profile evaluated");
        Ok(decision)
    }

    pub fn contains_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn contains_test(&self, name: &str) -> bool {
        self.tests.contains_key(name)
    }

    /// Registered profile names, sorted
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered test names, sorted
    pub fn test_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tests.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("profiles", &self.profile_names())
            .field("tests", &self.test_names())
            .finish()
    }
}

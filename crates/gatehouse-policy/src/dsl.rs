//! Rule tree builder
//!
//! ```ignore
//! definition.register_profile("member", |rules| {
//!     rules.allow("apps#index");
//!     rules.allow_if("apps#show", upon("user", |user| user.asks_with_same_id(["app_id"])));
//!     rules.scope(|admin| {
//!         admin.continue_if(upon("user", |user| user.is("admin")));
//!         admin.allow("apps#destroy");
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! ```

use crate::context::kind::{Base, Kind};
use crate::context::{ActorView, DefaultView, View};
use crate::profile::{ActionMatch, Profile, Rule, Upon, Validate};
use gatehouse_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registered profiles, addressable by `expand`
pub(crate) type Profiles = HashMap<String, Arc<dyn Validate<Base>>>;

/// Collects the rules of one profile or scope
pub struct Rules<'r, K> {
    profiles: &'r Profiles,
    rules: Vec<Rule<K>>,
}

impl<'r, K: Kind> Rules<'r, K> {
    pub(crate) fn new(profiles: &'r Profiles) -> Self {
        Self {
            profiles,
            rules: Vec::new(),
        }
    }

    /// Allow `action` unconditionally
    pub fn allow(&mut self, action: impl Into<ActionMatch>) -> &mut Self {
        self.rules.push(Rule::Allow {
            action: action.into(),
            predicate: None,
        });
        self
    }

    /// Allow `action` when `predicate` holds
    pub fn allow_if<F>(&mut self, action: impl Into<ActionMatch>, predicate: F) -> &mut Self
    where
        F: Fn(&View<'_, K>) -> Result<bool> + Send + Sync + 'static,
    {
        self.rules.push(Rule::Allow {
            action: action.into(),
            predicate: Some(Arc::new(predicate)),
        });
        self
    }

    /// Forbid `action` unconditionally
    pub fn forbid(&mut self, action: impl Into<ActionMatch>) -> &mut Self {
        self.rules.push(Rule::Forbid {
            action: action.into(),
            predicate: None,
        });
        self
    }

    /// Forbid `action` when `predicate` holds
    pub fn forbid_if<F>(&mut self, action: impl Into<ActionMatch>, predicate: F) -> &mut Self
    where
        F: Fn(&View<'_, K>) -> Result<bool> + Send + Sync + 'static,
    {
        self.rules.push(Rule::Forbid {
            action: action.into(),
            predicate: Some(Arc::new(predicate)),
        });
        self
    }

    /// Stop evaluating this rule list unless `predicate` holds
    pub fn continue_if<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&View<'_, K>) -> Result<bool> + Send + Sync + 'static,
    {
        self.rules.push(Rule::Continue {
            predicate: Arc::new(predicate),
        });
        self
    }

    /// Inline an already registered profile
    pub fn expand(&mut self, name: &str) -> Result<&mut Self> {
        let profile = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| Error::setup(format!("profile not found '{}'", name)))?;
        self.rules.push(Rule::Expand {
            name: name.to_string(),
            profile,
        });
        Ok(self)
    }

    /// Group rules whose breaks stay inside the group
    pub fn scope<F>(&mut self, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Rules<'_, K>) -> Result<()>,
    {
        let mut child = Rules::new(self.profiles);
        build(&mut child)?;
        self.rules.push(Rule::Scope {
            profile: Arc::new(child.into_profile()),
        });
        Ok(self)
    }

    /// Group rules evaluated inside a narrowed context
    ///
    /// The group evaluates to `Default` when the narrowing does not load.
    pub fn scope_upon<N, C, F>(&mut self, context: C, build: F) -> Result<&mut Self>
    where
        N: Kind,
        C: for<'a> Fn(&View<'a, K>) -> Result<View<'a, N>> + Send + Sync + 'static,
        F: FnOnce(&mut Rules<'_, N>) -> Result<()>,
    {
        let mut child = Rules::new(self.profiles);
        build(&mut child)?;
        self.rules.push(Rule::Scope {
            profile: Arc::new(Upon::new(Arc::new(context), child.into_profile())),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn into_profile(self) -> Profile<K> {
        Profile::new(self.rules)
    }
}

/// Predicate narrowing on a named actor first
///
/// False when the actor is not available for the request.
pub fn upon<F>(
    actor: &str,
    predicate: F,
) -> impl Fn(&DefaultView<'_>) -> Result<bool> + Send + Sync + 'static
where
    F: Fn(&ActorView<'_>) -> Result<bool> + Send + Sync + 'static,
{
    let actor = actor.to_string();
    move |view| view.the(actor.as_str())?.that(|narrowed| predicate(narrowed))
}

/// Predicate that only requires a named actor to be present
pub fn upon_actor(actor: &str) -> impl Fn(&DefaultView<'_>) -> Result<bool> + Send + Sync + 'static {
    let actor = actor.to_string();
    move |view| Ok(view.the(actor.as_str())?.is_loaded())
}

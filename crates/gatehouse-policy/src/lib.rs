//! Gatehouse Policy Engine
//!
//! Declarative authorization rules evaluated against a chain of typed context
//! views.
//!
//! A policy is a [`Definition`]: named tests plus named profiles. Each profile
//! is an ordered rule tree (`allow`, `forbid`, `continue`, `expand`, `scope`)
//! whose predicates narrow the request through views:
//! - a default view selects actors, loads resources and reads the request
//! - an actor view adds ownership checks against resources
//! - a resource view resolves attributes and relations
//! - a value view compares
//!
//! Profiles can be registered in code through [`Rules`] or loaded from YAML
//! through [`PolicyDocument`]. The [`Guard`] turns profile decisions into an
//! authorization outcome for one request.

pub mod context;
pub mod definition;
pub mod document;
pub mod dsl;
pub mod guard;
pub mod profile;
pub mod provider;
pub mod stack;

pub use context::{
    ActorView, AnyView, Binding, DefaultView, MultiView, Operand, Predicate, ResourceView,
    Tests, ValueView, View, WhereScope,
};
pub use definition::Definition;
pub use document::PolicyDocument;
pub use dsl::{upon, upon_actor, Rules};
pub use guard::{Exemptions, Guard, ProfileOutcome, Report, Verdict};
pub use profile::{ActionMatch, ActionSet, Decision, Profile, Rule, Upon, Validate};
pub use provider::{Provider, RequestProvider};
pub use stack::{Entry, NotFound, Stack, Tag};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::context::{ActorView, DefaultView, Operand, ResourceView, ValueView, View};
    pub use crate::definition::Definition;
    pub use crate::document::PolicyDocument;
    pub use crate::dsl::{upon, upon_actor, Rules};
    pub use crate::guard::{Guard, Verdict};
    pub use crate::profile::Decision;
    pub use crate::provider::{Provider, RequestProvider};
    pub use gatehouse_core::{Error, Record, Result, Value};
}

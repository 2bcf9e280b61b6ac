//! Profile rule trees and their evaluator
//!
//! A profile is an ordered list of rules. Evaluation walks the list once and
//! stops at the first rule producing a terminal outcome:
//! - `Allow` / `Forbid` end the whole evaluation when their action and
//!   predicate match
//! - `Continue` ends this rule list with [`Decision::Break`] when its
//!   predicate fails
//! - `Expand` inlines another profile and propagates anything but `Default`
//! - `Scope` runs a nested rule list and only propagates `Allowed`/`Forbidden`

use crate::context::kind::{Base, Kind};
use crate::context::{Predicate, View};
use gatehouse_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Outcome of evaluating a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// An allow rule matched
    Allowed,
    /// A forbid rule matched, vetoing every other profile
    Forbidden,
    /// A continue guard failed
    Break,
    /// No rule applied
    Default,
}

impl Decision {
    /// Allowed or Forbidden
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Allowed | Self::Forbidden)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Forbidden => "forbidden",
            Self::Break => "break",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action identifiers a caller wants checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(BTreeSet<String>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.contains(action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", actions.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for ActionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for ActionSet {
    fn from(action: &str) -> Self {
        std::iter::once(action).collect()
    }
}

impl From<String> for ActionSet {
    fn from(action: String) -> Self {
        std::iter::once(action).collect()
    }
}

impl<const N: usize> From<[&str; N]> for ActionSet {
    fn from(actions: [&str; N]) -> Self {
        actions.into_iter().collect()
    }
}

impl From<Vec<String>> for ActionSet {
    fn from(actions: Vec<String>) -> Self {
        actions.into_iter().collect()
    }
}

impl From<&[&str]> for ActionSet {
    fn from(actions: &[&str]) -> Self {
        actions.iter().copied().collect()
    }
}

/// Which actions an allow or forbid rule applies to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionMatch {
    /// Every action
    #[default]
    Any,
    /// Only these actions
    Only(BTreeSet<String>),
}

impl ActionMatch {
    pub fn only<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(actions.into_iter().map(Into::into).collect())
    }

    /// True when the rule's actions intersect the requested ones
    pub fn matches(&self, actions: &ActionSet) -> bool {
        match self {
            Self::Any => true,
            Self::Only(own) => own.iter().any(|action| actions.contains(action)),
        }
    }
}

impl fmt::Display for ActionMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Only(actions) => {
                let actions: Vec<&str> = actions.iter().map(String::as_str).collect();
                f.write_str(&actions.join("|"))
            }
        }
    }
}

impl From<&str> for ActionMatch {
    fn from(action: &str) -> Self {
        Self::only([action])
    }
}

impl From<String> for ActionMatch {
    fn from(action: String) -> Self {
        Self::only([action])
    }
}

impl<const N: usize> From<[&str; N]> for ActionMatch {
    fn from(actions: [&str; N]) -> Self {
        Self::only(actions)
    }
}

impl From<Vec<String>> for ActionMatch {
    fn from(actions: Vec<String>) -> Self {
        Self::only(actions)
    }
}

/// Anything that evaluates to a [`Decision`] inside a view of kind `K`
pub trait Validate<K>: Send + Sync {
    fn validate(&self, view: &View<'_, K>, actions: &ActionSet) -> Result<Decision>;
}

/// A single rule of a profile
pub enum Rule<K> {
    Allow {
        action: ActionMatch,
        predicate: Option<Predicate<K>>,
    },
    Forbid {
        action: ActionMatch,
        predicate: Option<Predicate<K>>,
    },
    Continue {
        predicate: Predicate<K>,
    },
    Expand {
        name: String,
        profile: Arc<dyn Validate<Base>>,
    },
    Scope {
        profile: Arc<dyn Validate<K>>,
    },
}

impl<K> Rule<K> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Allow { .. } => "allow",
            Self::Forbid { .. } => "forbid",
            Self::Continue { .. } => "continue",
            Self::Expand { .. } => "expand",
            Self::Scope { .. } => "scope",
        }
    }
}

impl<K> fmt::Debug for Rule<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow { action, predicate } | Self::Forbid { action, predicate } => f
                .debug_struct(self.kind_name())
                .field("action", &action.to_string())
                .field("conditional", &predicate.is_some())
                .finish(),
            Self::Continue { .. } | Self::Scope { .. } => f.write_str(self.kind_name()),
            Self::Expand { name, .. } => f.debug_tuple("expand").field(name).finish(),
        }
    }
}

/// An ordered rule list
pub struct Profile<K> {
    rules: Vec<Rule<K>>,
}

impl<K> Profile<K> {
    pub fn new(rules: Vec<Rule<K>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule<K>] {
        &self.rules
    }
}

impl<K> fmt::Debug for Profile<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.rules).finish()
    }
}

fn holds<K: Kind>(predicate: &Option<Predicate<K>>, view: &View<'_, K>) -> Result<bool> {
    match predicate {
        Some(predicate) => predicate(view),
        None => Ok(true),
    }
}

impl<K: Kind> Validate<K> for Profile<K> {
    fn validate(&self, view: &View<'_, K>, actions: &ActionSet) -> Result<Decision> {
        for (index, rule) in self.rules.iter().enumerate() {
            let decision = match rule {
                Rule::Allow { action, predicate } => {
                    if action.matches(actions) && holds(predicate, view)? {
                        Some(Decision::Allowed)
                    } else {
                        None
                    }
                }
                Rule::Forbid { action, predicate } => {
                    if action.matches(actions) && holds(predicate, view)? {
                        Some(Decision::Forbidden)
                    } else {
                        None
                    }
                }
                Rule::Continue { predicate } => {
                    if predicate(view)? {
                        None
                    } else {
                        Some(Decision::Break)
                    }
                }
                Rule::Expand { profile, .. } => match profile.validate(&view.widen(), actions)? {
                    Decision::Default => None,
                    other => Some(other),
                },
                Rule::Scope { profile } => match profile.validate(view, actions)? {
                    other if other.is_terminal() => Some(other),
                    _ => None,
                },
            };

            if let Some(decision) = decision {
                trace!(rule = index, kind = rule.kind_name(), %decision, "rule decided");
                return Ok(decision);
            }
        }

        Ok(Decision::Default)
    }
}

/// Narrowing applied to a view before a profile runs
pub type Narrow<In, Out> =
    Arc<dyn for<'a> Fn(&View<'a, In>) -> Result<View<'a, Out>> + Send + Sync>;

/// A profile evaluated inside a narrowed context
///
/// When the narrowing does not load (missing actor, missing resource) the
/// profile does not apply and evaluates to [`Decision::Default`].
pub struct Upon<In, Out> {
    context: Narrow<In, Out>,
    profile: Profile<Out>,
}

impl<In, Out> Upon<In, Out> {
    pub fn new(context: Narrow<In, Out>, profile: Profile<Out>) -> Self {
        Self { context, profile }
    }
}

impl<In: Kind, Out: Kind> Validate<In> for Upon<In, Out> {
    fn validate(&self, view: &View<'_, In>, actions: &ActionSet) -> Result<Decision> {
        let narrowed = (self.context)(view)?;
        if !narrowed.is_loaded() {
            trace!(context = Out::NAME, "context not loaded");
            return Ok(Decision::Default);
        }
        self.profile.validate(&narrowed, actions)
    }
}

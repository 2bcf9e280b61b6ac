//! Typed context views
//!
//! A view binds the request provider, the registered tests and a snapshot of
//! the context stack. Its kind decides which matchers it offers: a default view
//! can select actors and read the request, an actor view adds ownership checks,
//! a resource view adds attribute and relation checks, a value view compares.
//!
//! Chaining never mutates the caller's view. A failed lookup produces a view
//! whose stack is gone; such a view is not loaded and every matcher called on
//! it evaluates false without touching the provider.

pub mod matchers;

use crate::provider::Provider;
use crate::stack::{Stack, Tag};
use gatehouse_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub use matchers::{Binding, Operand, WhereScope};

/// View kinds and the capabilities they carry
pub mod kind {
    mod sealed {
        pub trait Sealed {}
    }

    /// A view kind
    pub trait Kind: sealed::Sealed + Send + Sync + 'static {
        const NAME: &'static str;
    }

    /// Entry view over the request
    #[derive(Debug)]
    pub enum Base {}
    /// View narrowed on an actor
    #[derive(Debug)]
    pub enum Actor {}
    /// View narrowed on a loaded resource
    #[derive(Debug)]
    pub enum Resource {}
    /// View narrowed on a single value
    #[derive(Debug)]
    pub enum Value {}
    /// View over several resources, presence only
    #[derive(Debug)]
    pub enum Multi {}

    macro_rules! kinds {
        ($($kind:ident => $name:literal),*) => {
            $(
                impl sealed::Sealed for $kind {}
                impl Kind for $kind {
                    const NAME: &'static str = $name;
                }
            )*
        };
    }

    kinds!(Base => "default", Actor => "actor", Resource => "resource", Value => "value", Multi => "multi");

    /// Can select named actors (`the`)
    pub trait NamesActors: Kind {}
    /// Can load preloaded resources (`loaded`)
    pub trait LoadsResources: Kind {}
    /// Can read the request (`asks_with`, `asks_for`)
    pub trait ReadsRequest: Kind {}
    /// Can resolve attributes of the top value (`has`, `is`)
    pub trait Attributes: Kind {}
    /// Can evaluate free-form expressions (`where_`)
    pub trait Expressions: Kind {}
    /// Can add further resources (`plus`)
    pub trait Joins: Kind {}

    impl NamesActors for Base {}
    impl NamesActors for Actor {}

    impl LoadsResources for Base {}
    impl LoadsResources for Actor {}

    impl ReadsRequest for Base {}
    impl ReadsRequest for Actor {}

    impl Attributes for Actor {}
    impl Attributes for Resource {}

    impl Expressions for Actor {}
    impl Expressions for Resource {}
    impl Expressions for Value {}
    impl Expressions for Multi {}

    impl Joins for Resource {}
    impl Joins for Multi {}
}

use kind::Kind;

/// A boolean predicate evaluated inside a view of kind `K`
pub type Predicate<K> = Arc<dyn Fn(&View<'_, K>) -> Result<bool> + Send + Sync>;

/// Named tests, evaluated inside a default view over the caller's stack
pub type Tests = HashMap<String, Predicate<kind::Base>>;

pub type DefaultView<'a> = View<'a, kind::Base>;
pub type ActorView<'a> = View<'a, kind::Actor>;
pub type ResourceView<'a> = View<'a, kind::Resource>;
pub type ValueView<'a> = View<'a, kind::Value>;
pub type MultiView<'a> = View<'a, kind::Multi>;

#[derive(Clone, Copy)]
struct Env<'a> {
    provider: &'a dyn Provider,
    tests: &'a Tests,
}

/// A typed, immutable view over a stack snapshot
pub struct View<'a, K> {
    env: Env<'a>,
    stack: Option<Stack>,
    kind: PhantomData<fn() -> K>,
}

impl<'a, K> Clone for View<'a, K> {
    fn clone(&self) -> Self {
        Self {
            env: self.env,
            stack: self.stack.clone(),
            kind: PhantomData,
        }
    }
}

impl<'a, K: Kind> fmt::Debug for View<'a, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("kind", &K::NAME)
            .field("stack", &self.stack)
            .finish()
    }
}

impl<'a> View<'a, kind::Base> {
    /// Fresh default view over an empty stack
    pub fn root(provider: &'a dyn Provider, tests: &'a Tests) -> Self {
        Self {
            env: Env { provider, tests },
            stack: Some(Stack::new()),
            kind: PhantomData,
        }
    }
}

impl<'a, K: Kind> View<'a, K> {
    fn with_stack(env: Env<'a>, stack: Option<Stack>) -> Self {
        Self {
            env,
            stack,
            kind: PhantomData,
        }
    }

    /// False once a lookup along the chain has failed
    pub fn is_loaded(&self) -> bool {
        self.stack.is_some()
    }

    /// The stack snapshot, absent when not loaded
    pub fn stack(&self) -> Option<&Stack> {
        self.stack.as_ref()
    }

    /// Name of this view's kind
    pub fn kind_name(&self) -> &'static str {
        K::NAME
    }

    pub(crate) fn provider(&self) -> &'a dyn Provider {
        self.env.provider
    }

    /// The single chaining primitive
    ///
    /// `step` runs only on a loaded view and returns the extended stack, or
    /// `None` when its lookup found nothing.
    pub(crate) fn chain<N: Kind>(
        &self,
        step: impl FnOnce(&Stack) -> Result<Option<Stack>>,
    ) -> Result<View<'a, N>> {
        let stack = match &self.stack {
            Some(stack) => step(stack)?,
            None => None,
        };
        Ok(View::with_stack(self.env, stack))
    }

    /// Evaluate a predicate inside this view, false when not loaded
    pub fn that<F>(&self, predicate: F) -> Result<bool>
    where
        F: FnOnce(&Self) -> Result<bool>,
    {
        if !self.is_loaded() {
            return Ok(false);
        }
        predicate(self)
    }

    /// Default view over the same stack
    pub fn widen(&self) -> DefaultView<'a> {
        View::with_stack(self.env, self.stack.clone())
    }

    /// Run one of the definition's named tests against this stack
    pub fn happens(&self, test: &str) -> Result<bool> {
        let predicate = self
            .env
            .tests
            .get(test)
            .ok_or_else(|| Error::setup(format!("invalid test name '{}'", test)))?;
        if !self.is_loaded() {
            return Ok(false);
        }
        predicate(&self.widen())
    }

    /// Re-type this view after the role of its most recent entry
    pub fn reinterpret(&self) -> AnyView<'a> {
        let tag = self
            .stack
            .as_ref()
            .and_then(Stack::top_entry)
            .map(|entry| entry.tag);
        let (env, stack) = (self.env, self.stack.clone());
        match tag {
            None => AnyView::Default(View::with_stack(env, stack)),
            Some(Tag::Actor) => AnyView::Actor(View::with_stack(env, stack)),
            Some(Tag::Resource) => AnyView::Resource(View::with_stack(env, stack)),
            Some(Tag::Value) => AnyView::Value(View::with_stack(env, stack)),
            Some(Tag::Multi) => AnyView::Multi(View::with_stack(env, stack)),
        }
    }
}

/// A view whose kind is only known at runtime
#[derive(Debug, Clone)]
pub enum AnyView<'a> {
    Default(DefaultView<'a>),
    Actor(ActorView<'a>),
    Resource(ResourceView<'a>),
    Value(ValueView<'a>),
    Multi(MultiView<'a>),
}

impl<'a> AnyView<'a> {
    pub fn is_loaded(&self) -> bool {
        match self {
            Self::Default(v) => v.is_loaded(),
            Self::Actor(v) => v.is_loaded(),
            Self::Resource(v) => v.is_loaded(),
            Self::Value(v) => v.is_loaded(),
            Self::Multi(v) => v.is_loaded(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Default(v) => v.kind_name(),
            Self::Actor(v) => v.kind_name(),
            Self::Resource(v) => v.kind_name(),
            Self::Value(v) => v.kind_name(),
            Self::Multi(v) => v.kind_name(),
        }
    }

    pub fn widen(&self) -> DefaultView<'a> {
        match self {
            Self::Default(v) => v.clone(),
            Self::Actor(v) => v.widen(),
            Self::Resource(v) => v.widen(),
            Self::Value(v) => v.widen(),
            Self::Multi(v) => v.widen(),
        }
    }

    pub fn happens(&self, test: &str) -> Result<bool> {
        self.widen().happens(test)
    }
}

macro_rules! any_view_from {
    ($($variant:ident => $kind:ident),*) => {
        $(
            impl<'a> From<View<'a, kind::$kind>> for AnyView<'a> {
                fn from(view: View<'a, kind::$kind>) -> Self {
                    Self::$variant(view)
                }
            }
        )*
    };
}

any_view_from!(Default => Base, Actor => Actor, Resource => Resource, Value => Value, Multi => Multi);

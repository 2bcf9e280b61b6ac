//! Matchers available on context views
//!
//! Each submodule adds an inherent `impl` block on [`View`](super::View),
//! restricted to the kinds that carry the matching capability.

mod asks_for;
mod asks_with;
mod equality;
mod expression;
mod has;
mod is;
mod load;
mod plus;
mod relation;
mod the;

pub use expression::WhereScope;

use gatehouse_core::Value;

/// Name of an actor, resource or parameter, and the name it is pushed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    key: String,
    alias: Option<String>,
}

impl Binding {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            alias: None,
        }
    }

    /// Push the entry under another name
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name used to look the entry up from the provider
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name the entry is pushed under
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.key)
    }
}

impl From<&str> for Binding {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Binding {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<&String> for Binding {
    fn from(key: &String) -> Self {
        Self::new(key.as_str())
    }
}

/// Right-hand side of a value comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal value
    Literal(Value),
    /// An attribute of the nearest enclosing actor
    Own(String),
}

impl Operand {
    /// Compare against the nearest actor's attribute instead of a literal
    pub fn own(attribute: impl Into<String>) -> Self {
        Self::Own(attribute.into())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

macro_rules! literal_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_operand!(i32, i64, u32, u64, f64, bool, &str, String);

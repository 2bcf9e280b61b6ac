use crate::context::kind::Expressions;
use crate::context::View;
use crate::stack::{Stack, Tag};
use gatehouse_core::{Result, Value};

/// Name resolution for free-form expressions
///
/// Names resolve to the nearest stack entry pushed under them; an unknown
/// name is an [`Unbound`](gatehouse_core::Error::Unbound) error, never false.
#[derive(Debug, Clone, Copy)]
pub struct WhereScope<'s> {
    stack: &'s Stack,
}

impl<'s> WhereScope<'s> {
    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Result<&'s Value> {
        Ok(self.stack.resolve(name)?)
    }

    /// Attribute `key` of the value bound to `name`
    pub fn attr(&self, name: &str, key: &str) -> Result<Value> {
        self.get(name)?.resolve(key)
    }

    /// Value of the most recent entry
    pub fn current(&self) -> Option<&'s Value> {
        self.stack.top()
    }

    /// Nearest actor on the stack
    pub fn actor(&self) -> Option<&'s Value> {
        self.stack.top_tagged(Tag::Actor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stack.resolve(name).is_ok()
    }
}

impl<'a, K: Expressions> View<'a, K> {
    /// Evaluate an expression over the names bound on the stack
    pub fn where_<F>(&self, expression: F) -> Result<bool>
    where
        F: FnOnce(&WhereScope<'_>) -> Result<bool>,
    {
        match self.stack() {
            Some(stack) => expression(&WhereScope { stack }),
            None => Ok(false),
        }
    }
}

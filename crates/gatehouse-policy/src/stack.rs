//! Immutable context stack
//!
//! Every push returns a new stack that shares its tail with the old one, so a
//! stack captured anywhere during evaluation keeps observing the same entries.

use gatehouse_core::Value;
use std::fmt;
use std::sync::Arc;

/// Role of a stack entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Actor,
    Resource,
    Value,
    /// A resource joined next to others through `plus`
    Multi,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Actor => write!(f, "actor"),
            Tag::Resource => write!(f, "resource"),
            Tag::Value => write!(f, "value"),
            Tag::Multi => write!(f, "multi"),
        }
    }
}

/// A tagged, named binding
#[derive(Debug, Clone)]
pub struct Entry {
    pub tag: Tag,
    pub name: String,
    pub value: Value,
}

/// Raised by [`Stack::resolve`] when no entry carries the requested name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no stack entry named '{0}'")]
pub struct NotFound(pub String);

impl From<NotFound> for gatehouse_core::Error {
    fn from(err: NotFound) -> Self {
        gatehouse_core::Error::Unbound(err.0)
    }
}

#[derive(Debug)]
struct Node {
    entry: Entry,
    tail: Option<Arc<Node>>,
}

/// Persistent singly linked stack of entries
#[derive(Debug, Clone, Default)]
pub struct Stack {
    head: Option<Arc<Node>>,
    len: usize,
}

impl Stack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Create a new stack with this one as tail
    pub fn push(&self, tag: Tag, name: impl Into<String>, value: Value) -> Stack {
        Stack {
            head: Some(Arc::new(Node {
                entry: Entry {
                    tag,
                    name: name.into(),
                    value,
                },
                tail: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Most recently pushed entry
    pub fn top_entry(&self) -> Option<&Entry> {
        self.head.as_deref().map(|node| &node.entry)
    }

    /// Value of the most recently pushed entry
    pub fn top(&self) -> Option<&Value> {
        self.top_entry().map(|entry| &entry.value)
    }

    /// Value of the nearest entry with the given tag
    pub fn top_tagged(&self, tag: Tag) -> Option<&Value> {
        self.iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| &entry.value)
    }

    /// Value of the nearest entry with the given name
    pub fn resolve(&self, name: &str) -> Result<&Value, NotFound> {
        self.iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
            .ok_or_else(|| NotFound(name.to_string()))
    }

    /// Entries from the most recent to the oldest
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// True if both stacks share the same head node
    pub fn ptr_eq(&self, other: &Stack) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Iterator over stack entries, most recent first
pub struct Iter<'a> {
    next: Option<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.tail.as_deref();
        Some(&node.entry)
    }
}

//! Gatehouse Core
//!
//! Shared error handling and the domain value model used by the Gatehouse
//! policy engine.
//!
//! This crate provides:
//! - The error type and result alias, separating policy setup errors from
//!   authorization outcomes and collaborator failures
//! - Opaque values and the attribute resolution rules matchers rely on
//! - The association reflection contract consumed by ownership matchers

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::{parameterize, Association, Data, Object, Record, Reflection, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::value::{Association, Data, Object, Record, Reflection, Value};
}

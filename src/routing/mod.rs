//! Routing module
//!
//! Turns a request path into an operation and a trusted page title:
//! - Strict grammar: `/{view|edit|save}/{title}`
//! - Permissive grammar: additionally a bare `/{title}` as an alias for view

mod title;

pub use title::{validate, Grammar, Operation, Route};

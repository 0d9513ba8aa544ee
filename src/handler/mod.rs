//! Request handler module
//!
//! HTTP entry point, the operation dispatcher, and the page handlers.

pub mod dispatch;
pub mod pages;
pub mod request;
pub mod router;

// Re-export main entry point
pub use dispatch::Dispatcher;
pub use pages::PageContext;
pub use router::handle_request;

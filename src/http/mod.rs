//! HTTP protocol layer module
//!
//! Status-code response builders and conditional-request helpers,
//! kept free of wiki types so the transport edge stays thin.

pub mod cache;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_304_response, build_400_response, build_404_response, build_405_response,
    build_413_response, build_415_response, build_500_response, build_health_response, build_html_response,
    build_redirect_response,
};

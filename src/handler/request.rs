//! Transport-independent request and response types
//!
//! The hyper layer converts to and from these so page handlers and the
//! dispatcher can be exercised without a socket.

use hyper::Method;
use percent_encoding::percent_decode;
use std::collections::HashMap;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// What a page handler sees of an HTTP request
#[derive(Debug, Clone)]
pub struct WikiRequest {
    pub method: Method,
    pub path: String,
    /// Decoded form values, kept as raw bytes
    form: HashMap<String, Vec<u8>>,
    /// A body arrived in an encoding that was not decoded
    unread_body: bool,
}

impl WikiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            form: HashMap::new(),
            unread_body: false,
        }
    }

    /// Build from raw parts, decoding form fields from the body and query
    ///
    /// Body fields take precedence over query fields with the same name,
    /// and the first occurrence of a name wins.
    pub fn from_parts(
        method: Method,
        path: impl Into<String>,
        query: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Self {
        let mut request = Self::new(method, path);
        if content_type.is_some_and(is_form_content_type) {
            request.merge_form(body);
        } else {
            request.unread_body = !body.is_empty();
        }
        if let Some(query) = query {
            request.merge_form(query.as_bytes());
        }
        request
    }

    /// Attach one form field, keeping any existing value
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl AsRef<[u8]>) -> Self {
        self.form
            .entry(name.to_string())
            .or_insert_with(|| value.as_ref().to_vec());
        self
    }

    /// Mark the request as carrying a body nobody decoded
    #[must_use]
    pub const fn with_unread_body(mut self) -> Self {
        self.unread_body = true;
        self
    }

    /// Form field value, empty when absent
    pub fn form_value(&self, name: &str) -> &[u8] {
        self.form.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// True when the body was sent in a content type other than
    /// `application/x-www-form-urlencoded`
    pub const fn has_unread_body(&self) -> bool {
        self.unread_body
    }

    fn merge_form(&mut self, encoded: &[u8]) {
        for pair in encoded.split(|&b| b == b'&').filter(|p| !p.is_empty()) {
            let (name, value) = match pair.iter().position(|&b| b == b'=') {
                Some(eq) => (&pair[..eq], &pair[eq + 1..]),
                None => (pair, &[][..]),
            };
            let name = String::from_utf8_lossy(&decode_component(name)).into_owned();
            self.form
                .entry(name)
                .or_insert_with(|| decode_component(value));
        }
    }
}

/// `+` is a space; `%XX` escapes become the exact byte, UTF-8 or not
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Outcome of a page operation, before it becomes an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WikiResponse {
    /// Rendered page markup
    Html(String),
    /// 302 to another wiki path
    Redirect(String),
    /// Path outside the grammar, or nothing registered for it
    NotFound,
    /// Valid path, wrong method; carries the `Allow` header value
    MethodNotAllowed(String),
    /// Body sent in an encoding the operation cannot read
    UnsupportedMediaType,
    /// Storage or render failure; carries the message for the error log
    ServerError(String),
}

impl WikiResponse {
    pub const fn status(&self) -> u16 {
        match self {
            Self::Html(_) => 200,
            Self::Redirect(_) => 302,
            Self::NotFound => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::UnsupportedMediaType => 415,
            Self::ServerError(_) => 500,
        }
    }
}

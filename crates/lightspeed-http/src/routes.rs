//! Route templates and rate-limit scope keys.
//!
//! A [`Route`] pairs an HTTP method with a path template. Path
//! parameters are substituted percent-encoded into the concrete path,
//! while the [`RouteKey`] keeps the placeholders — routes that differ
//! only in their parameters share one rate-limit scope.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Method;

/// Characters that must be escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One outbound call target: method, path template, and the concrete
/// path with parameters filled in.
#[derive(Clone, Debug)]
pub struct Route {
    method: Method,
    template: &'static str,
    path: String,
}

impl Route {
    /// Create a route from a method and a path template such as
    /// `"/streams/{stream_id}/bans/{user_id}"`.
    #[must_use]
    pub fn new(method: Method, template: &'static str) -> Self {
        Self {
            method,
            template,
            path: template.to_owned(),
        }
    }

    /// Substitute a path parameter, percent-encoding the value.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl AsRef<str>) -> Self {
        let encoded = utf8_percent_encode(value.as_ref(), PATH_SEGMENT).to_string();
        self.path = self.path.replace(&format!("{{{name}}}"), &encoded);
        self
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Concrete request path with parameters substituted.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The rate-limit scope key: method plus template, parameters
    /// normalized out.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey(format!("{} {}", self.method, self.template))
    }
}

/// Normalized identifier for a class of calls sharing one rate-limit
/// scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteKey(String);

impl RouteKey {
    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_substitutes_and_encodes() {
        let route = Route::new(Method::GET, "/streams/{user_path}").param("user_path", "some channel");
        assert_eq!(route.path(), "/streams/some%20channel");
    }

    #[test]
    fn key_normalizes_parameters_out() {
        let a = Route::new(Method::DELETE, "/chat/{chat_id}/messages/{message_id}")
            .param("chat_id", "c1")
            .param("message_id", "m1");
        let b = Route::new(Method::DELETE, "/chat/{chat_id}/messages/{message_id}")
            .param("chat_id", "c2")
            .param("message_id", "m2");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "DELETE /chat/{chat_id}/messages/{message_id}");
    }

    #[test]
    fn keys_distinguish_methods() {
        let get = Route::new(Method::GET, "/streams/");
        let put = Route::new(Method::PUT, "/streams/");
        assert_ne!(get.key(), put.key());
    }

    #[test]
    fn slash_in_parameter_cannot_escape_the_segment() {
        let route = Route::new(Method::GET, "/users/{user_path}").param("user_path", "a/../b");
        assert_eq!(route.path(), "/users/a%2F..%2Fb");
    }
}

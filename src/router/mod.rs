//! Request Router
//!
//! Maps an HTTP method and path onto one of the service routes.

use hyper::Method;
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Methods every route answers
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Router errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("No route for path: {0}")]
    NotFound(String),

    #[error("Method {method} not allowed for {route}")]
    MethodNotAllowed { method: String, route: &'static str },
}

impl RouterError {
    /// Template of the matched route, if the path matched one
    pub fn route_template(&self) -> Option<&'static str> {
        match self {
            RouterError::NotFound(_) => None,
            RouterError::MethodNotAllowed { route, .. } => Some(route),
        }
    }
}

/// Service routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// GET /
    Index,
    /// GET /example
    Example,
    /// GET /user/{username}
    User { username: String },
}

impl Route {
    /// Route template, used for span names and the `http.route` attribute
    pub fn template(&self) -> &'static str {
        match self {
            Route::Index => "/",
            Route::Example => "/example",
            Route::User { .. } => "/user/{username}",
        }
    }

    /// Match a request path against the known routes
    ///
    /// The username segment is percent-decoded (invalid UTF-8 is replaced)
    /// and may be empty. The decoded username may not contain `/`.
    pub fn match_path(path: &str) -> Option<Route> {
        match path {
            "/" => Some(Route::Index),
            "/example" => Some(Route::Example),
            _ => {
                let segment = path.strip_prefix("/user/")?;
                let username = percent_decode_str(segment).decode_utf8_lossy().into_owned();
                // Checked after decoding: `%2F` counts as a separator
                if username.contains('/') {
                    return None;
                }
                Some(Route::User { username })
            }
        }
    }
}

/// Request Router
pub struct Router;

impl Router {
    /// Resolve a request to a route
    ///
    /// GET, HEAD and OPTIONS are accepted on every route; anything else on a
    /// known path is `MethodNotAllowed`.
    pub fn resolve(method: &Method, path: &str) -> Result<Route, RouterError> {
        let route = Route::match_path(path).ok_or_else(|| RouterError::NotFound(path.to_string()))?;

        if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
            Ok(route)
        } else {
            Err(RouterError::MethodNotAllowed {
                method: method.to_string(),
                route: route.template(),
            })
        }
    }
}

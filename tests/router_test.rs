//! Router Integration Tests
//!
//! Route resolution for every path and method combination the service
//! distinguishes.

use hyper::Method;
use otel_hello_service::router::{Route, Router, RouterError};

#[test]
fn test_route_templates() {
    assert_eq!(Route::Index.template(), "/");
    assert_eq!(Route::Example.template(), "/example");
    assert_eq!(
        Route::User {
            username: "x".into()
        }
        .template(),
        "/user/{username}"
    );
}

#[test]
fn test_resolve_known_paths() {
    assert_eq!(Router::resolve(&Method::GET, "/"), Ok(Route::Index));
    assert_eq!(Router::resolve(&Method::GET, "/example"), Ok(Route::Example));
    assert_eq!(
        Router::resolve(&Method::GET, "/user/alice"),
        Ok(Route::User {
            username: "alice".into()
        })
    );
}

#[test]
fn test_head_and_options_accepted() {
    for method in [Method::HEAD, Method::OPTIONS] {
        assert_eq!(Router::resolve(&method, "/example"), Ok(Route::Example));
    }
}

#[test]
fn test_username_keeps_json_special_characters() {
    let route = Router::resolve(&Method::GET, "/user/%22quoted%22%5C%7B%7D").unwrap();
    assert_eq!(
        route,
        Route::User {
            username: "\"quoted\"\\{}".into()
        }
    );
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let route = Router::resolve(&Method::GET, "/user/%FF").unwrap();
    assert_eq!(
        route,
        Route::User {
            username: "\u{FFFD}".into()
        }
    );
}

#[test]
fn test_unknown_paths() {
    for path in ["/missing", "/user", "/users/alice", "/example/extra", ""] {
        assert_eq!(
            Router::resolve(&Method::GET, path),
            Err(RouterError::NotFound(path.to_string())),
            "path {:?}",
            path
        );
    }
}

#[test]
fn test_method_not_allowed() {
    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        let err = Router::resolve(&method, "/user/alice").unwrap_err();
        assert_eq!(
            err,
            RouterError::MethodNotAllowed {
                method: method.to_string(),
                route: "/user/{username}",
            }
        );
    }
}

#[test]
fn test_unknown_path_wins_over_method() {
    assert!(matches!(
        Router::resolve(&Method::POST, "/missing"),
        Err(RouterError::NotFound(_))
    ));
}

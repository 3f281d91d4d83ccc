//! Request routing.
//!
//! Maps `POST /process/<filter>/<x>,<y>,<w>,<h>` onto a [`Route`]. Only the
//! shape of the path is checked here; whether the filter token names a real
//! filter is decided later by the registry, so a bad filter name is a
//! validation failure rather than a routing one.

use crate::core::error::MismatchReason;
use crate::core::types::Rect;
use axum::http::Method;

/// A request that matched the routing grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Raw filter token, e.g. `threshold(40)`.
    pub filter: String,
    /// Requested rectangle.
    pub rect: Rect,
}

/// Outcome of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The request matched and can be processed.
    Matched(Route),
    /// The request did not match; respond generically.
    Mismatch(MismatchReason),
}

/// Two-stage router: match the path shape, then check the method.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    prefix: String,
}

impl RequestRouter {
    /// Create a router for paths below `/<prefix>/`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Route a request by method and path.
    pub fn resolve(&self, method: &Method, path: &str) -> RouteOutcome {
        let Some(route) = self.parse_path(path) else {
            return RouteOutcome::Mismatch(MismatchReason::NotFound);
        };
        if *method != Method::POST {
            return RouteOutcome::Mismatch(MismatchReason::MethodNotAllowed);
        }
        RouteOutcome::Matched(route)
    }

    fn parse_path(&self, path: &str) -> Option<Route> {
        let path = path.strip_prefix('/')?;
        let path = path.strip_suffix('/').unwrap_or(path);

        let mut segments = path.split('/');
        let prefix = segments.next()?;
        let filter = segments.next()?;
        let coords = segments.next()?;
        if segments.next().is_some() || prefix != self.prefix || filter.is_empty() {
            return None;
        }

        Some(Route {
            filter: filter.to_string(),
            rect: parse_rect(coords)?,
        })
    }
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::new("process")
    }
}

/// Parse `x,y,w,h` as four base-10 `i32` values.
fn parse_rect(coords: &str) -> Option<Rect> {
    let mut values = [0i32; 4];
    let mut parts = coords.split(',');
    for value in values.iter_mut() {
        *value = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    let [x, y, width, height] = values;
    Some(Rect::new(x, y, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(filter: &str, x: i32, y: i32, w: i32, h: i32) -> RouteOutcome {
        RouteOutcome::Matched(Route {
            filter: filter.to_string(),
            rect: Rect::new(x, y, w, h),
        })
    }

    #[test]
    fn test_match_valid_paths() {
        let router = RequestRouter::default();
        assert_eq!(
            router.resolve(&Method::POST, "/process/grayscale/1,2,3,4"),
            matched("grayscale", 1, 2, 3, 4)
        );
        assert_eq!(
            router.resolve(&Method::POST, "/process/threshold(40)/-5,-5,+20,20"),
            matched("threshold(40)", -5, -5, 20, 20)
        );
        assert_eq!(
            router.resolve(&Method::POST, "/process/sepia/0,0,0,0/"),
            matched("sepia", 0, 0, 0, 0)
        );
    }

    #[test]
    fn test_unknown_filter_still_matches() {
        let router = RequestRouter::default();
        assert_eq!(
            router.resolve(&Method::POST, "/process/blur/1,2,3,4"),
            matched("blur", 1, 2, 3, 4)
        );
    }

    #[test]
    fn test_wrong_method_on_valid_path() {
        let router = RequestRouter::default();
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::HEAD] {
            assert_eq!(
                router.resolve(&method, "/process/sepia/1,2,3,4"),
                RouteOutcome::Mismatch(MismatchReason::MethodNotAllowed)
            );
        }
    }

    #[test]
    fn test_paths_outside_grammar() {
        let router = RequestRouter::default();
        for path in [
            "/",
            "/process",
            "/process/sepia",
            "/process/sepia/",
            "/process/sepia/a,b,c,d",
            "/process/sepia/1,2,3",
            "/process/sepia/1,2,3,4,5",
            "/process/sepia/1,2,3,4/extra",
            "/process//1,2,3,4",
            "/other/sepia/1,2,3,4",
            "process/sepia/1,2,3,4",
            "/process/sepia/1, 2,3,4",
            "/process/sepia/1,2,3,99999999999",
        ] {
            assert_eq!(
                router.resolve(&Method::POST, path),
                RouteOutcome::Mismatch(MismatchReason::NotFound),
                "{path} should not match"
            );
        }
    }

    #[test]
    fn test_mismatch_wins_over_method() {
        let router = RequestRouter::default();
        assert_eq!(
            router.resolve(&Method::GET, "/nothing/here"),
            RouteOutcome::Mismatch(MismatchReason::NotFound)
        );
    }

    #[test]
    fn test_custom_prefix() {
        let router = RequestRouter::new("/filters/");
        assert_eq!(
            router.resolve(&Method::POST, "/filters/sepia/1,1,1,1"),
            matched("sepia", 1, 1, 1, 1)
        );
        assert_eq!(
            router.resolve(&Method::POST, "/process/sepia/1,1,1,1"),
            RouteOutcome::Mismatch(MismatchReason::NotFound)
        );
    }
}

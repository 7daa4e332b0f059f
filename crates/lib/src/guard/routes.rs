//! Public-route classification.

use serde::{Deserialize, Serialize};
use url::Url;

/// One entry of the public-route allow-list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "path", rename_all = "lowercase")]
pub enum RoutePredicate {
    /// Matches exactly this path.
    Exact(String),
    /// Matches this path and everything beneath it (`/a` matches `/a` and `/a/b`, not `/ab`).
    Subtree(String),
}

impl RoutePredicate {
    pub fn path(&self) -> &str {
        match self {
            RoutePredicate::Exact(p) | RoutePredicate::Subtree(p) => p,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePredicate::Exact(p) => path == p,
            RoutePredicate::Subtree(p) => {
                path == p
                    || path
                        .strip_prefix(p.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Paths viewable without signing in.
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/services",
    "/services/plumbing",
    "/services/electrical",
    "/services/cleaning",
    "/services/pest-control",
    "/services/ac-service",
    "/services/painting",
    "/emergency",
    "/book-service",
    "/track-booking",
    "/find-provider",
    "/support",
    "/company/about",
    "/company/careers",
    "/company/blog",
    "/company/press",
    "/company/partners",
    "/support/help-center",
    "/support/faq",
    "/support/terms",
    "/support/privacy",
    "/support/refund",
    "/support/sitemap",
    "/about",
    "/contact",
    "/terms",
    "/privacy",
    "/login",
    "/search",
    "/bookings",
    "/provider",
    "/admin",
];

/// Ordered public-route allow-list. Static configuration, never derived at runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    predicates: Vec<RoutePredicate>,
}

impl RouteTable {
    pub fn new(predicates: Vec<RoutePredicate>) -> Self {
        Self { predicates }
    }

    pub fn predicates(&self) -> &[RoutePredicate] {
        &self.predicates
    }

    /// Whether `location` is public.
    ///
    /// `location` may carry a query string or fragment; only the path is classified.
    /// Locations that cannot be parsed are treated as protected.
    pub fn is_public(&self, location: &str) -> bool {
        let Some(path) = normalize_path(location) else {
            tracing::warn!(location, "Unparseable route, treating as protected");
            return false;
        };
        self.predicates.iter().any(|p| p.matches(&path))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_PUBLIC_ROUTES
                .iter()
                .map(|p| RoutePredicate::Subtree((*p).to_string()))
                .collect(),
        )
    }
}

/// Reduce a location (`/a/b?x=1#top`) to its path (`/a/b`).
pub fn normalize_path(location: &str) -> Option<String> {
    // `//host/path` would resolve against another host.
    if !location.starts_with('/') || location.starts_with("//") {
        return None;
    }
    let base = Url::parse("http://app.invalid/").ok()?;
    let resolved = base.join(location).ok()?;
    Some(resolved.path().to_string())
}

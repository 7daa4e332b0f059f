//! Public-route classification.

use servicehub::{
    RouteTable, Settings,
    guard::{DEFAULT_PUBLIC_ROUTES, RoutePredicate, normalize_path},
};

#[test]
fn every_default_route_and_its_children_are_public() {
    let table = RouteTable::default();
    for route in DEFAULT_PUBLIC_ROUTES {
        assert!(table.is_public(route), "{route} should be public");
        if *route != "/" {
            let child = format!("{route}/details");
            assert!(table.is_public(&child), "{child} should be public");
        }
    }
}

#[test]
fn protected_paths() {
    let table = RouteTable::default();
    for path in ["/profile", "/settings", "/dashboard/bookings", "/aboutus", "/servicesx"] {
        assert!(!table.is_public(path), "{path} should be protected");
    }
}

#[test]
fn query_and_fragment_are_ignored() {
    let table = RouteTable::default();
    assert!(table.is_public("/search?q=plumber#results"));
    assert!(!table.is_public("/profile?tab=stats"));
    assert_eq!(normalize_path("/a/b?x=1#top").as_deref(), Some("/a/b"));
}

#[test]
fn unparseable_locations_are_protected() {
    let table = RouteTable::default();
    assert!(!table.is_public("services"));
    assert!(!table.is_public("//evil.example/"));
    assert!(!table.is_public(""));
}

#[test]
fn injected_minimal_table() {
    let table = RouteTable::new(vec![
        RoutePredicate::Exact("/".into()),
        RoutePredicate::Subtree("/help".into()),
    ]);
    assert!(table.is_public("/"));
    assert!(table.is_public("/help/faq"));
    assert!(!table.is_public("/services"));
}

#[test]
fn settings_round_trip_route_predicates() {
    let json = r#"{
        "home_route": "/",
        "public_routes": [
            {"match": "exact", "path": "/"},
            {"match": "subtree", "path": "/docs"}
        ]
    }"#;
    let settings: Settings = serde_json::from_str(json).unwrap();
    settings.validate().unwrap();

    let table = settings.route_table();
    assert!(table.is_public("/docs/intro"));
    assert!(!table.is_public("/search"));
}

#[test]
fn protected_home_route_is_rejected() {
    let settings = Settings {
        home_route: "/profile".into(),
        ..Settings::default()
    };
    assert!(settings.validate().is_err());
}

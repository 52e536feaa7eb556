// Tests for link classification and extraction

use url::Url;
use wayfinder_core::frontier::Frontier;
use wayfinder_core::links::{ExclusionRules, LinkClass, LinkNormalizer};

fn normalizer() -> LinkNormalizer {
    LinkNormalizer::new(
        Url::parse("https://example.com/").unwrap(),
        ExclusionRules::new(["/logout"]),
    )
}

fn classify(href: &str) -> LinkClass {
    normalizer().classify(href, |_| false)
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_root_relative_link_is_crawlable() {
    assert_eq!(
        classify("/about"),
        LinkClass::Crawlable(Url::parse("https://example.com/about").unwrap())
    );
}

#[test]
fn test_fragment_is_stripped() {
    assert_eq!(
        classify("/about#team"),
        LinkClass::Crawlable(Url::parse("https://example.com/about").unwrap())
    );
}

#[test]
fn test_query_is_stripped() {
    assert_eq!(
        classify("/search?q=a"),
        LinkClass::Crawlable(Url::parse("https://example.com/search").unwrap())
    );
}

#[test]
fn test_fragment_only_href() {
    assert_eq!(classify("#main"), LinkClass::Fragment);
    assert_eq!(classify(""), LinkClass::Fragment);
}

#[test]
fn test_mailto_href() {
    assert_eq!(classify("mailto:team@example.com"), LinkClass::Mailto);
    assert_eq!(classify("MAILTO:team@example.com"), LinkClass::Mailto);
}

#[test]
fn test_protocol_relative_is_out_of_scope() {
    assert_eq!(classify("//cdn.example.org/lib.js"), LinkClass::OutOfScope);
}

#[test]
fn test_other_origin_is_out_of_scope() {
    assert_eq!(classify("https://other.example.org/"), LinkClass::OutOfScope);
    assert_eq!(classify("http://example.com/about"), LinkClass::OutOfScope);
    assert_eq!(classify("tel:+15555550100"), LinkClass::OutOfScope);
}

#[test]
fn test_document_relative_is_out_of_scope() {
    assert_eq!(classify("about"), LinkClass::OutOfScope);
    assert_eq!(classify("../about"), LinkClass::OutOfScope);
}

#[test]
fn test_absolute_same_origin_is_crawlable() {
    assert_eq!(
        classify("https://example.com/contact"),
        LinkClass::Crawlable(Url::parse("https://example.com/contact").unwrap())
    );
}

#[test]
fn test_excluded_link() {
    assert_eq!(
        classify("/logout"),
        LinkClass::Excluded("/logout".to_string())
    );
    assert_eq!(
        classify("/account/logout?next=/"),
        LinkClass::Excluded("/logout".to_string())
    );
}

#[test]
fn test_malformed_link() {
    assert!(matches!(classify("http://[::1"), LinkClass::Malformed(_)));
}

#[test]
fn test_already_visited_link() {
    let visited = Url::parse("https://example.com/about").unwrap();
    let class = normalizer().classify("/about", |u| *u == visited);
    assert_eq!(class, LinkClass::AlreadyVisited(visited.clone()));
}

// ============================================================================
// Per-page extraction
// ============================================================================

#[test]
fn test_crawlable_links_dedup_and_order() {
    let hrefs: Vec<String> = [
        "/b",
        "#top",
        "/a",
        "/b#again",
        "mailto:x@example.com",
        "/logout",
        "https://elsewhere.example/",
        "/c",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let links = normalizer().crawlable_links(&hrefs, &Frontier::default());
    let paths: Vec<&str> = links.iter().map(|u| u.path()).collect();
    assert_eq!(paths, vec!["/b", "/a", "/c"]);
}

#[test]
fn test_crawlable_links_skip_visited() {
    let mut frontier = Frontier::default();
    let about = Url::parse("https://example.com/about").unwrap();
    frontier.enqueue(about.clone(), 0);
    frontier.dequeue();
    frontier.mark_visited(&about);

    let hrefs = vec!["/about".to_string(), "/team".to_string()];
    let links = normalizer().crawlable_links(&hrefs, &frontier);
    assert_eq!(links, vec![Url::parse("https://example.com/team").unwrap()]);
}

#[test]
fn test_query_variants_collapse_to_one_link() {
    let hrefs: Vec<String> = ["/search?q=a", "/search?q=b", "/search"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let links = normalizer().crawlable_links(&hrefs, &Frontier::default());
    assert_eq!(links, vec![Url::parse("https://example.com/search").unwrap()]);
}

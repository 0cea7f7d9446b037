//! Integration tests for classmerge.
//!
//! These drive the public API from outside the crate: rules are ingested
//! from a Tailwind-shaped stylesheet and class lists are merged against them.

use std::sync::Arc;

use classmerge::css::rules::extract_rules;
use classmerge::{Cache, Merger, MergerConfig, SimpleCache};
use pretty_assertions::assert_eq;

const TAILWIND: &str = include_str!("fixtures/tailwind.css");

fn merger() -> Merger {
    let merger = Merger::new(MergerConfig::new()).unwrap_or_else(|e| panic!("merger: {e}"));
    merger
        .add_rules(TAILWIND.as_bytes(), false)
        .unwrap_or_else(|e| panic!("add_rules: {e}"));
    merger
}

fn check(cases: &[(&str, &str)]) {
    let merger = merger();
    for (input, want) in cases {
        assert_eq!(merger.merge(input), *want, "merging {input:?}");
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[test]
fn test_fixture_extracts_without_error() {
    let rules = extract_rules(TAILWIND, false).unwrap_or_else(|e| panic!("extract: {e}"));
    // `@font-face` and `@keyframes` contribute nothing.
    assert!(rules.iter().all(|rule| !rule.to_css().contains("font-family")));
    assert!(rules.iter().all(|rule| !rule.to_css().contains("rotate")));
    assert!(rules
        .iter()
        .any(|rule| rule.at_rule_condition == "(display:grid)"));
}

#[test]
fn test_add_rules_from_reader() {
    let merger = merger();
    assert!(merger.rule("supports-[display:grid]:grid").is_some());
    assert!(merger.rule("file:border-0").is_some());
    assert!(merger.rule("nope").is_none());
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[test]
fn test_pseudo_class_variants() {
    check(&[
        ("hover:p-2 hover:p-4", "hover:p-4"),
        ("p-2 hover:p-4", "p-2 hover:p-4"),
        ("hover:block hover:inline", "hover:inline"),
        ("hover:block hover:focus:inline", "hover:block hover:focus:inline"),
        (
            "hover:block hover:focus:inline focus:hover:inline",
            "hover:block focus:hover:inline",
        ),
        ("hover:focus:p-3 focus:hover:p-1", "focus:hover:p-1"),
        ("read-only:p-2 read-only:p-3", "read-only:p-3"),
        ("read-only:p-2 hover:p-4", "read-only:p-2 hover:p-4"),
    ]);
}

#[test]
fn test_pseudo_element_variants() {
    check(&[
        ("file:border-0 file:border-2", "file:border-2"),
        ("file:border-0 p-2", "file:border-0 p-2"),
    ]);
}

#[test]
fn test_media_and_supports_variants() {
    check(&[
        ("sm:block sm:hidden", "sm:hidden"),
        ("block sm:hidden", "block sm:hidden"),
        ("sm:p-2 md:p-2 p-2", "sm:p-2 md:p-2 p-2"),
        ("sm:p-2 sm:hover:p-4 hover:p-2", "sm:p-2 sm:hover:p-4 hover:p-2"),
        (
            "supports-[display:grid]:flex supports-[display:grid]:grid",
            "supports-[display:grid]:grid",
        ),
    ]);
}

#[test]
fn test_selector_context_variants() {
    check(&[
        ("[&>*]:underline [&>*]:line-through", "[&>*]:line-through"),
        (
            "[&>*]:underline [&>*]:line-through [&_div]:line-through",
            "[&>*]:line-through [&_div]:line-through",
        ),
        ("underline [&>*]:line-through", "underline [&>*]:line-through"),
        ("*:p-4 *:p-10", "*:p-10"),
        ("p-2 *:p-10", "p-2 *:p-10"),
        ("group-hover:p-2 group-hover:p-3", "group-hover:p-3"),
        ("group group-hover:p-2", "group group-hover:p-2"),
    ]);
}

// ---------------------------------------------------------------------------
// Property groups
// ---------------------------------------------------------------------------

#[test]
fn test_inset_conflicts() {
    check(&[
        ("inset-1 inset-x-1", "inset-1 inset-x-1"),
        ("inset-x-1 inset-1", "inset-1"),
        ("inset-x-1 left-1 inset-1", "inset-1"),
        ("inset-x-1 inset-1 left-1", "inset-1 left-1"),
        ("inset-x-1 right-1 inset-1", "inset-1"),
        ("inset-x-1 right-1 inset-x-1", "inset-x-1"),
        ("inset-x-1 right-1 inset-y-1", "inset-x-1 right-1 inset-y-1"),
        ("right-1 inset-x-1 inset-y-1", "inset-x-1 inset-y-1"),
        ("inset-x-1 hover:left-1 inset-1", "hover:left-1 inset-1"),
    ]);
}

#[test]
fn test_unregistered_properties_conflict_by_name() {
    check(&[
        ("stroke-[hsl(350_80%_0%)] stroke-[10px]", "stroke-[hsl(350_80%_0%)] stroke-[10px]"),
        ("fill-current fill-none", "fill-none"),
    ]);
}

#[test]
fn test_important_modifier() {
    check(&[
        ("!font-medium !font-bold", "!font-bold"),
        ("!font-medium !font-bold font-thin", "!font-bold font-thin"),
        ("font-thin !font-medium", "!font-medium"),
    ]);
}

// ---------------------------------------------------------------------------
// Custom properties
// ---------------------------------------------------------------------------

#[test]
fn test_ring_and_shadow_do_not_conflict() {
    check(&[("ring shadow", "ring shadow"), ("shadow ring", "shadow ring")]);
}

#[test]
fn test_custom_property_setters() {
    check(&[
        ("bg-red-500 bg-blue-500", "bg-blue-500"),
        ("bg-blue-500 bg-opacity-50", "bg-blue-500 bg-opacity-50"),
        ("bg-opacity-50 bg-blue-500", "bg-blue-500"),
        // Nothing reads --tw-bg-opacity here.
        ("bg-opacity-50 p-2", "p-2"),
        // --tw-ring-color is only read through --tw-ring-shadow.
        ("ring ring-red-500 ring-blue-500", "ring ring-blue-500"),
    ]);
}

// ---------------------------------------------------------------------------
// Cache and configuration
// ---------------------------------------------------------------------------

#[test]
fn test_shared_cache() {
    let cache = Arc::new(SimpleCache::new());
    let merger = Merger::new(MergerConfig::new().with_cache(cache.clone()))
        .unwrap_or_else(|e| panic!("merger: {e}"));
    merger
        .add_css(TAILWIND, false)
        .unwrap_or_else(|e| panic!("add_css: {e}"));

    assert_eq!(merger.merge("inset-x-1 inset-1"), "inset-1");
    assert_eq!(cache.get("inset-x-1 inset-1"), Some("inset-1".to_string()));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_custom_registry() {
    let registry = classmerge::css::properties::PropertyRegistry::from_json(
        r#"{ "spacing": { "computed": ["gap-x", "gap-y"] } }"#,
    )
    .unwrap_or_else(|e| panic!("registry: {e}"));
    let merger = Merger::new(MergerConfig::new().with_registry(Arc::new(registry)))
        .unwrap_or_else(|e| panic!("merger: {e}"));
    merger
        .add_css(".gx { gap-x: 1px } .s { spacing: 2px } .p-2 { padding: 1px } .p-1 { padding: 2px }", false)
        .unwrap_or_else(|e| panic!("add_css: {e}"));

    assert_eq!(merger.merge("gx s"), "s");
    assert_eq!(merger.merge("s gx"), "s gx");
    // `padding` is unknown to this table, so it only conflicts with itself.
    assert_eq!(merger.merge("p-2 p-1"), "p-1");
}

#[test]
fn test_concurrent_merges() {
    let merger = Arc::new(merger());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let merger = Arc::clone(&merger);
            std::thread::spawn(move || merger.merge("p-2 p-1 hover:p-2 hover:p-4"))
        })
        .collect();
    for handle in handles {
        let got = handle.join().unwrap_or_else(|_| panic!("merge thread panicked"));
        assert_eq!(got, "p-1 hover:p-4");
    }
}

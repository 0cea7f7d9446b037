//! Class conflict resolution.
//!
//! A [`Merger`] indexes CSS rules by the class names their selectors mention
//! and answers [`Merger::merge`] queries against that index. For every
//! longhand property a class list sets, under a given condition (media query,
//! pseudo-classes, selector context), only the last class to set it is kept.
//! Classes without a known rule are always kept.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use regex::Regex;

use crate::cache::Cache;
use crate::css::properties::PropertyRegistry;
use crate::css::rules::{extract_rules, CssDeclaration, CssRule};
use crate::css::serialize::escape;
use crate::error::Error;

// ---------------------------------------------------------------------------
// MergerConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Merger`].
#[derive(Clone)]
pub struct MergerConfig {
    /// Return kept classes in the order they first appear in the input.
    /// Otherwise they come back sorted.
    pub keep_sort: bool,
    /// Memoizes merge results, keyed by the raw input string.
    pub cache: Option<Arc<dyn Cache>>,
    /// Property table. `None` loads the embedded one.
    pub registry: Option<Arc<PropertyRegistry>>,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            keep_sort: true,
            cache: None,
            registry: None,
        }
    }
}

impl MergerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output ordering (builder).
    pub fn with_keep_sort(mut self, keep_sort: bool) -> Self {
        self.keep_sort = keep_sort;
        self
    }

    /// Set the result cache (builder).
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the property table (builder).
    pub fn with_registry(mut self, registry: Arc<PropertyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

// ---------------------------------------------------------------------------
// Merger
// ---------------------------------------------------------------------------

/// Resolves conflicting utility classes against an index of CSS rules.
///
/// `merge` may be called from many threads at once. Ingestion calls are
/// serialized with each other and swap rules in under a short write lock.
pub struct Merger {
    ingest: Mutex<()>,
    rules: RwLock<HashMap<String, Arc<CssRule>>>,
    cache: Option<Arc<dyn Cache>>,
    registry: Arc<PropertyRegistry>,
    keep_sort: bool,
}

/// The last class to set a custom property under one condition key.
struct CustomSetter<'c> {
    name: &'c str,
    class: &'c str,
    references: Vec<String>,
}

/// Last writer per condition key, collected over one class list.
#[derive(Default)]
struct Buckets<'c> {
    props: HashMap<String, &'c str>,
    important: HashMap<String, &'c str>,
    custom: HashMap<String, CustomSetter<'c>>,
    /// Custom properties referenced by the last writer of each key.
    references: HashMap<String, Vec<String>>,
}

impl<'c> Buckets<'c> {
    /// Custom properties reachable from ordinary declarations, directly or
    /// through the values of other custom properties.
    fn live_custom_properties(&self) -> HashSet<&str> {
        let mut live: HashSet<&str> = self
            .references
            .values()
            .flatten()
            .map(String::as_str)
            .collect();
        let mut pending: Vec<&str> = live.iter().copied().collect();
        while let Some(name) = pending.pop() {
            for setter in self.custom.values().filter(|s| s.name == name) {
                for reference in &setter.references {
                    if live.insert(reference.as_str()) {
                        pending.push(reference.as_str());
                    }
                }
            }
        }
        live
    }
}

impl Merger {
    /// Create an empty merger. Fails only if the embedded property table
    /// cannot be loaded.
    pub fn new(config: MergerConfig) -> Result<Self, Error> {
        let registry = match config.registry {
            Some(registry) => registry,
            None => Arc::new(PropertyRegistry::embedded()?),
        };
        Ok(Self {
            ingest: Mutex::new(()),
            rules: RwLock::new(HashMap::new()),
            cache: config.cache,
            registry,
            keep_sort: config.keep_sort,
        })
    }

    /// Read CSS from `reader` and index its rules.
    ///
    /// Each rule is stored under every class its selector mentions; a class
    /// that is already known gets the new rule. The cache is cleared even if
    /// reading or extraction fails, and nothing is indexed in that case.
    pub fn add_rules<R: Read>(&self, mut reader: R, inline: bool) -> Result<(), Error> {
        let _guard = self.ingest.lock();
        self.clear_cache();

        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        let rules = extract_rules(&source, inline)?;

        let mut indexed = 0usize;
        {
            let mut index = self.rules.write();
            for rule in &rules {
                let shared = Arc::new(rule.clone());
                for class in rule.selector.class_names() {
                    index.insert(class.to_string(), Arc::clone(&shared));
                    indexed += 1;
                }
            }
        }
        // Drop anything cached while the index was being updated.
        self.clear_cache();

        log::debug!("extracted {} rules, indexed {indexed} class entries", rules.len());
        Ok(())
    }

    /// [`Merger::add_rules`] for CSS already in memory.
    pub fn add_css(&self, css: &str, inline: bool) -> Result<(), Error> {
        self.add_rules(css.as_bytes(), inline)
    }

    /// A snapshot of the class → rule index.
    pub fn rules(&self) -> HashMap<String, Arc<CssRule>> {
        self.rules.read().clone()
    }

    /// The rule indexed under `class`.
    pub fn rule(&self, class: &str) -> Option<Arc<CssRule>> {
        self.rules.read().get(class).cloned()
    }

    fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Longhands set by a declaration. Unknown properties stand for
    /// themselves, which covers custom properties and things like `fill`.
    fn longhands<'d>(&'d self, decl: &'d CssDeclaration) -> Vec<&'d str> {
        match self.registry.computed(&decl.property) {
            Some(computed) => computed.iter().map(String::as_str).collect(),
            None => vec![decl.property.as_str()],
        }
    }

    /// Resolve conflicts in a space-separated class list.
    ///
    /// Input with fewer than two classes is returned unchanged. Otherwise the
    /// result holds each kept class once, joined with single spaces.
    pub fn merge(&self, class_list: &str) -> String {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(class_list) {
                log::trace!("cache hit for {class_list:?}");
                return hit;
            }
        }

        let classes: Vec<&str> = class_list.split_whitespace().collect();
        if classes.len() < 2 {
            return class_list.to_string();
        }

        let rules = self.rules.read();
        let mut kept: Vec<&str> = Vec::with_capacity(classes.len());
        let mut buckets = Buckets::default();

        for &class in &classes {
            let Some(rule) = rules.get(class) else {
                kept.push(class);
                continue;
            };
            if rule.declarations.is_empty() {
                kept.push(class);
                continue;
            }

            let suffix = condition_suffix(rule, class);
            for decl in &rule.declarations {
                let references = custom_vars_in(&decl.value);
                for longhand in self.longhands(decl) {
                    let key = format!("{longhand}{suffix}");
                    if decl.is_custom_property() {
                        buckets.custom.insert(
                            key,
                            CustomSetter {
                                name: decl.property.as_str(),
                                class,
                                references: references.clone(),
                            },
                        );
                        continue;
                    }
                    buckets.references.insert(key.clone(), references.clone());
                    if decl.is_important() {
                        buckets.important.insert(key.clone(), class);
                    }
                    buckets.props.insert(key, class);
                }
            }
        }

        let live = buckets.live_custom_properties();
        kept.extend(buckets.props.values().copied());
        kept.extend(buckets.important.values().copied());
        kept.extend(
            buckets
                .custom
                .values()
                .filter(|setter| live.contains(setter.name))
                .map(|setter| setter.class),
        );

        unique(&mut kept);
        if self.keep_sort {
            sort_subset(&mut kept, &classes);
        }
        let out = kept.join(" ");

        if let Some(cache) = &self.cache {
            cache.set(class_list, out.clone());
        }
        out
    }
}

/// What distinguishes one class's declarations from another's beyond the
/// property name.
///
/// A bare class, or a class with only pseudo-classes and a pseudo-element,
/// is keyed by its at-rule condition and sorted pseudo string. Any other
/// selector is keyed by its own text with the class removed, so
/// `.\[\&\>\*\]\:underline > *` becomes `. > *`.
fn condition_suffix(rule: &CssRule, class: &str) -> String {
    if rule.selector.is_class() || rule.selector.is_class_with_pseudo() {
        return rule.condition();
    }
    let context = rule.selector.to_string().replacen(&escape(class), "", 1);
    format!("{}{context}", rule.at_rule_condition)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sort and remove duplicates.
pub fn unique<T: Ord>(items: &mut Vec<T>) {
    items.sort();
    items.dedup();
}

/// Stable-sort `subset` by where each item first appears in `full`. Items
/// missing from `full` go first, in their current order.
pub fn sort_subset<S: AsRef<str>>(subset: &mut [S], full: &[S]) {
    let mut first_seen: HashMap<&str, usize> = HashMap::with_capacity(full.len());
    for (i, item) in full.iter().enumerate() {
        first_seen.entry(item.as_ref()).or_insert(i);
    }
    subset.sort_by_key(|item| first_seen.get(item.as_ref()).copied());
}

fn custom_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"var\((--[\w-]+)").expect("var() reference regex compiles"))
}

/// Custom property names referenced through `var(--name` in `value`.
pub fn custom_vars_in(value: &str) -> Vec<String> {
    custom_var_pattern()
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

use std::rc::Rc;

use reform_core::{FormError, Path, PathStore};
use serde_json::Value;

/// Transforms applied at the storage boundary, so the stored representation
/// need not be the in-memory tag list itself.
pub type WrapFn = Rc<dyn Fn(&[String]) -> Value>;
pub type UnwrapFn = Rc<dyn Fn(&Value) -> Vec<String>>;
/// Autocomplete lookup; results are filtered against the current selection.
pub type LookupFn = Rc<dyn Fn(&str) -> Vec<String>>;

fn string_array(tags: &[String]) -> Value {
    Value::Array(tags.iter().map(|t| Value::String(t.clone())).collect())
}

pub(crate) fn read_string_array(store: &PathStore, prop: &Path) -> Vec<String> {
    match store.get_path(prop) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

/// Toggle semantics: append if absent, remove if present, then write the
/// whole collection back through the store. Membership order is toggle
/// insertion order. The write-back *is* the commit; callers never mutate a
/// shared live array.
pub(crate) fn toggle_option(store: &PathStore, prop: &Path, option: &str) {
    let mut selected = read_string_array(store, prop);
    if selected.iter().any(|s| s == option) {
        selected.retain(|s| s != option);
    } else {
        selected.push(option.to_string());
    }
    store.set_path(prop, string_array(&selected), false);
}

/// Unique-string collection with optional wrap/unwrap storage transforms.
pub(crate) struct TagSync {
    store: PathStore,
    prop: Path,
    wrap: Option<WrapFn>,
    unwrap: Option<UnwrapFn>,
}

impl TagSync {
    /// Fails fast when the stored value cannot be a tag collection: a
    /// non-array, or (without a custom unwrap) an array holding non-strings.
    /// That is broken wiring, not user input.
    pub fn bind(
        store: PathStore,
        prop: Path,
        initial: &[String],
        wrap: Option<WrapFn>,
        unwrap: Option<UnwrapFn>,
    ) -> Result<Rc<Self>, FormError> {
        match store.get_path(&prop) {
            None | Some(Value::Null) => {
                let seed = match &wrap {
                    Some(wrap) => wrap(initial),
                    None => string_array(initial),
                };
                store.set_path(&prop, seed, true);
            }
            Some(stored) if unwrap.is_none() => match &stored {
                Value::Array(items) if items.iter().all(Value::is_string) => {}
                _ => {
                    return Err(FormError::config(format!(
                        "tag field at `{prop}` expects an array of strings, found `{stored}`"
                    )));
                }
            },
            // a custom unwrap owns the stored shape
            Some(_) => {}
        }
        Ok(Rc::new(Self { store, prop, wrap, unwrap }))
    }

    pub fn tags(&self) -> Vec<String> {
        match &self.unwrap {
            Some(unwrap) => self
                .store
                .get_path(&self.prop)
                .map(|v| unwrap(&v))
                .unwrap_or_default(),
            None => read_string_array(&self.store, &self.prop),
        }
    }

    /// Rejected (returns false) for empty/whitespace input and duplicates.
    pub fn add(&self, raw: &str) -> bool {
        let tag = raw.trim();
        if tag.is_empty() {
            return false;
        }
        let mut tags = self.tags();
        if tags.iter().any(|t| t == tag) {
            log::debug!("duplicate tag `{tag}` ignored at {}", self.prop);
            return false;
        }
        tags.push(tag.to_string());
        self.write(&tags);
        true
    }

    /// Exact-match removal; removing an absent tag is a no-op and does not
    /// touch the store.
    pub fn remove(&self, tag: &str) {
        let tags = self.tags();
        if !tags.iter().any(|t| t == tag) {
            return;
        }
        let rest: Vec<String> = tags.into_iter().filter(|t| t != tag).collect();
        self.write(&rest);
    }

    /// Lookup results minus anything already selected.
    pub fn suggestions(&self, query: &str, lookup: &LookupFn) -> Vec<String> {
        let selected = self.tags();
        lookup(query)
            .into_iter()
            .filter(|s| !selected.iter().any(|t| t == s))
            .collect()
    }

    fn write(&self, tags: &[String]) {
        let value = match &self.wrap {
            Some(wrap) => wrap(tags),
            None => string_array(tags),
        };
        self.store.set_path(&self.prop, value, false);
    }
}

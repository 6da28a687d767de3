use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use slotmap::SlotMap;

use crate::path::{Path, Segment};
use crate::signal::SubKey;

type PathCallback = Rc<dyn Fn(Option<&Value>)>;

struct PathSub {
    /// `None` observes the whole store.
    path: Option<Path>,
    f: PathCallback,
}

/// Observable container over one form's JSON-like data.
///
/// Purely structural storage plus change notification; no validation happens
/// here. Writes come in three flavors:
///
/// - [`set_path`](PathStore::set_path) with `silent = false` and
///   [`set`](PathStore::set) notify overlapping subscribers *and* fire the
///   mutation hook (the lifecycle controller marks the form dirty there).
/// - [`set_path`](PathStore::set_path) with `silent = true` writes without
///   any notification. Default-value seeding uses this; programmatic
///   defaulting must never flip dirty state.
/// - [`replace`](PathStore::replace) notifies subscribers but skips the
///   mutation hook. This is the primitive under `commit`, where dirty is
///   cleared rather than re-marked.
#[derive(Clone)]
pub struct PathStore {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    data: RefCell<Value>,
    subs: RefCell<SlotMap<SubKey, PathSub>>,
    on_mutate: RefCell<Option<Rc<dyn Fn()>>>,
}

impl PathStore {
    pub fn new(initial: Value) -> Self {
        let initial = match initial {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self {
            inner: Rc::new(StoreInner {
                data: RefCell::new(initial),
                subs: RefCell::new(SlotMap::with_key()),
                on_mutate: RefCell::new(None),
            }),
        }
    }

    pub fn get(&self) -> Value {
        self.inner.data.borrow().clone()
    }

    /// Read the whole value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.data.borrow())
    }

    pub fn get_path(&self, path: &Path) -> Option<Value> {
        lookup(&self.inner.data.borrow(), path.segments()).cloned()
    }

    /// Write `value` at `path`, creating intermediate objects and arrays as
    /// needed. Non-silent writes notify every subscriber whose path overlaps
    /// the written one and fire the mutation hook.
    pub fn set_path(&self, path: &Path, value: Value, silent: bool) {
        write(&mut self.inner.data.borrow_mut(), path.segments(), value);
        if silent {
            return;
        }
        log::trace!("store write at {path}");
        self.notify(Some(path));
        self.fire_mutation_hook();
    }

    /// Wholesale replace; notifies all subscribers and marks the form dirty.
    pub fn set(&self, value: Value) {
        *self.inner.data.borrow_mut() = value;
        self.notify(None);
        self.fire_mutation_hook();
    }

    /// Wholesale replace without the mutation hook. Subscribers are still
    /// notified so bindings re-read the new data.
    pub fn replace(&self, value: Value) {
        *self.inner.data.borrow_mut() = value;
        self.notify(None);
    }

    /// Observe the value at `path`. The callback receives the value stored
    /// there (or `None`) after every overlapping non-silent write.
    pub fn subscribe(&self, path: Path, f: impl Fn(Option<&Value>) + 'static) -> SubKey {
        self.inner.subs.borrow_mut().insert(PathSub {
            path: Some(path),
            f: Rc::new(f),
        })
    }

    /// Observe every non-silent write.
    pub fn subscribe_root(&self, f: impl Fn(Option<&Value>) + 'static) -> SubKey {
        self.inner
            .subs
            .borrow_mut()
            .insert(PathSub { path: None, f: Rc::new(f) })
    }

    pub fn unsubscribe(&self, key: SubKey) {
        self.inner.subs.borrow_mut().remove(key);
    }

    /// Install the single mutation hook. The lifecycle controller owns this;
    /// installing a new hook replaces the previous one.
    pub fn set_mutation_hook(&self, f: impl Fn() + 'static) {
        *self.inner.on_mutate.borrow_mut() = Some(Rc::new(f));
    }

    fn fire_mutation_hook(&self) {
        let hook = self.inner.on_mutate.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    // `changed = None` means a wholesale write: everyone is notified.
    fn notify(&self, changed: Option<&Path>) {
        let targets: Vec<(Option<Path>, PathCallback)> = self
            .inner
            .subs
            .borrow()
            .values()
            .filter(|sub| match (&sub.path, changed) {
                (Some(sub_path), Some(changed)) => sub_path.overlaps(changed),
                _ => true,
            })
            .map(|sub| (sub.path.clone(), sub.f.clone()))
            .collect();
        for (path, f) in targets {
            let value = match &path {
                Some(p) => self.get_path(p),
                None => Some(self.get()),
            };
            f(value.as_ref());
        }
    }
}

fn lookup<'v>(root: &'v Value, segments: &[Segment]) -> Option<&'v Value> {
    let mut current = root;
    for seg in segments {
        current = match seg {
            Segment::Key(k) => current.as_object()?.get(k)?,
            Segment::Index(i) => current.as_array()?.get(*i)?,
        };
    }
    Some(current)
}

// A scalar in the middle of a path is replaced by the structure the next
// segment requires, matching create-on-write semantics.
fn write(node: &mut Value, segments: &[Segment], value: Value) {
    let Some((seg, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    match seg {
        Segment::Key(k) => {
            if !node.is_object() {
                *node = Value::Object(Default::default());
            }
            if let Value::Object(map) = node {
                write(map.entry(k.clone()).or_insert(Value::Null), rest, value);
            }
        }
        Segment::Index(n) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            if let Value::Array(arr) = node {
                if arr.len() <= *n {
                    arr.resize(*n + 1, Value::Null);
                }
                write(&mut arr[*n], rest, value);
            }
        }
    }
}

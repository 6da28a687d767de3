use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{Datelike, Local, NaiveDate};
use reform_core::{
    BoxError, FormError, Path, PathStore, Signal, Validations, signal,
};
use reform_navigation::{ConfirmPrompt, HookHandle, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::collections::{self, LookupFn, TagSync, UnwrapFn, WrapFn};
use crate::date::{DateSync, Part};
use crate::input::{InputHandler, InputMode, Transform, display_value};
use crate::view::{Binding, DatePartStyle, Field, FieldKind, FormView, PartInput, constant};

const UNSAVED_PROMPT: &str = "Form has unsaved changes.\n\
    Leaving this page will erase those changes.\n\
    Would you like to continue?";
const UNSAVED_UNLOAD_WARNING: &str = "Form has unsaved changes.";

/// How a form knows which data it holds. The historical engines differed
/// here; both modes live behind this one variant.
#[derive(Clone)]
pub enum Identity {
    /// Legacy: a key extracted from the data itself. `form()` with a `key`
    /// reloads through the caller's load callback when the stored data's
    /// key differs.
    KeyFn(Rc<dyn Fn(&Value) -> Option<String>>),
    /// The caller seeds the data directly at construction.
    Seeded(Value),
}

pub type LoadFn = Rc<dyn Fn(&str) -> Result<Value, BoxError>>;
pub type SubmitFn = Rc<dyn Fn(&Value) -> Result<Option<Value>, BoxError>>;

pub struct FormConfig {
    pub is_edit: bool,
    pub key: Option<String>,
    pub load: Option<LoadFn>,
    pub on_submit: SubmitFn,
    pub on_success: Option<Rc<dyn Fn(&Value)>>,
    pub on_error: Option<Rc<dyn Fn(&BoxError)>>,
    pub router: Router,
    pub prompt: Rc<dyn ConfirmPrompt>,
    /// Extra gate on the dirty-navigation prompt. When it answers false the
    /// navigation proceeds without prompting and without clearing, e.g. for
    /// a timed-out session whose unsaved data should not be erased.
    pub guard_when: Option<Rc<dyn Fn() -> bool>>,
}

impl FormConfig {
    pub fn new(
        router: Router,
        prompt: Rc<dyn ConfirmPrompt>,
        on_submit: impl Fn(&Value) -> Result<Option<Value>, BoxError> + 'static,
    ) -> Self {
        Self {
            is_edit: false,
            key: None,
            load: None,
            on_submit: Rc::new(on_submit),
            on_success: None,
            on_error: None,
            router,
            prompt,
            guard_when: None,
        }
    }
}

/// One controller per logical form. Owns the form's [`PathStore`] and the
/// `is_dirty` / `is_edit` lifecycle cells; every field edit funnels through
/// it.
pub struct FormState {
    inner: Rc<FormInner>,
}

struct FormInner {
    store: PathStore,
    is_dirty: Signal<bool>,
    is_edit: Signal<bool>,
    edit_default: Cell<bool>,
    identity: Identity,
    guards: RefCell<Vec<HookHandle>>,
    expanded: RefCell<HashMap<String, Signal<bool>>>,
    submitting: Cell<bool>,
}

impl Clone for FormState {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl FormState {
    pub fn new(identity: Identity) -> Self {
        let initial = match &identity {
            Identity::Seeded(v) => v.clone(),
            Identity::KeyFn(_) => Value::Object(Default::default()),
        };
        let store = PathStore::new(initial);
        let is_dirty = signal(false);
        {
            // any non-silent store write is a user-driven edit
            let dirty = is_dirty.clone();
            store.set_mutation_hook(move || dirty.set(true));
        }
        Self {
            inner: Rc::new(FormInner {
                store,
                is_dirty,
                is_edit: signal(false),
                edit_default: Cell::new(false),
                identity,
                guards: RefCell::new(Vec::new()),
                expanded: RefCell::new(HashMap::new()),
                submitting: Cell::new(false),
            }),
        }
    }

    pub fn with_data(initial: Value) -> Self {
        Self::new(Identity::Seeded(initial))
    }

    pub fn keyed(key_fn: impl Fn(&Value) -> Option<String> + 'static) -> Self {
        Self::new(Identity::KeyFn(Rc::new(key_fn)))
    }

    pub fn store(&self) -> PathStore {
        self.inner.store.clone()
    }

    pub fn get(&self) -> Value {
        self.inner.store.get()
    }

    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, FormError> {
        serde_json::from_value(self.get()).map_err(FormError::Data)
    }

    /// Wholesale replace, marking the form dirty.
    pub fn set(&self, new_data: Value) {
        self.inner.store.set(new_data);
    }

    pub fn set_from<T: Serialize>(&self, value: &T) -> Result<(), FormError> {
        self.set(serde_json::to_value(value).map_err(FormError::Data)?);
        Ok(())
    }

    /// Wholesale replace without touching edit mode; dirty is cleared.
    pub fn commit(&self, new_data: Value) {
        self.inner.store.replace(new_data);
        self.inner.is_dirty.set(false);
    }

    pub fn commit_from<T: Serialize>(&self, value: &T) -> Result<(), FormError> {
        self.commit(serde_json::to_value(value).map_err(FormError::Data)?);
        Ok(())
    }

    pub fn is_dirty(&self) -> Signal<bool> {
        self.inner.is_dirty.clone()
    }

    pub fn is_edit(&self) -> Signal<bool> {
        self.inner.is_edit.clone()
    }

    /// Release any held guard registrations, clear dirty, and reset edit
    /// mode to the default from the most recent `form()` call.
    pub fn clear(&self) {
        self.release_guards();
        self.inner.is_dirty.set(false);
        self.inner.is_edit.set(self.inner.edit_default.get());
        log::debug!("form state cleared");
    }

    /// One expand-state cell per group key, shared across renders.
    pub fn expanded(&self, key: &str) -> Signal<bool> {
        self.inner
            .expanded
            .borrow_mut()
            .entry(key.to_string())
            .or_insert_with(|| signal(false))
            .clone()
    }

    /// Build the bound form surface. Fresh per call: earlier guard
    /// registrations are released and new ones acquired, so re-rendering a
    /// form never leaks a registration.
    pub fn form(&self, cfg: FormConfig, children: Vec<Field>) -> Result<FormView, FormError> {
        self.release_guards();
        self.inner.edit_default.set(cfg.is_edit);
        self.inner.is_edit.set(cfg.is_edit);

        if let Some(key) = &cfg.key {
            let Identity::KeyFn(key_fn) = &self.inner.identity else {
                return Err(FormError::config(
                    "binding a form to a key requires a key-extracting identity",
                ));
            };
            let matches = self
                .inner
                .store
                .with(|data| key_fn(data).as_deref() == Some(key.as_str()));
            if !matches {
                let load = cfg.load.as_ref().ok_or_else(|| {
                    FormError::config("a load callback is required when binding a form to a key")
                })?;
                let loaded = load(key).map_err(FormError::Load)?;
                log::debug!("form data loaded for key `{key}`");
                self.commit(loaded);
            }
        }

        // Hooks hold the form weakly: a dropped controller must not be kept
        // alive by its router, and its registrations die with it.
        let before = {
            let weak = Rc::downgrade(&self.inner);
            let prompt = cfg.prompt.clone();
            let guard_when = cfg.guard_when.clone();
            cfg.router.listen_before(move |_| {
                let Some(inner) = weak.upgrade() else {
                    return Ok(());
                };
                FormState { inner }.confirm_clear_dirty(prompt.as_ref(), guard_when.as_ref())
            })
        };
        let after = {
            // successful navigation releases every registration, this one
            // included
            let weak = Rc::downgrade(&self.inner);
            cfg.router.listen_after(move |_| {
                if let Some(inner) = weak.upgrade() {
                    FormState { inner }.release_guards();
                }
            })
        };
        let unload = {
            let dirty = self.inner.is_dirty.clone();
            cfg.router
                .guard_unload(move || dirty.get().then(|| UNSAVED_UNLOAD_WARNING.to_string()))
        };
        self.inner
            .guards
            .borrow_mut()
            .extend([before, after, unload]);

        let on_submit = {
            let st = self.clone();
            let submit = cfg.on_submit.clone();
            let on_success = cfg.on_success.clone();
            let on_error = cfg.on_error.clone();
            Rc::new(move || st.run_submit(&submit, on_success.as_ref(), on_error.as_ref()))
        };

        Ok(FormView { children, on_submit })
    }

    fn confirm_clear_dirty(
        &self,
        prompt: &dyn ConfirmPrompt,
        guard_when: Option<&Rc<dyn Fn() -> bool>>,
    ) -> Result<(), FormError> {
        if !self.inner.is_dirty.get() {
            return Ok(());
        }
        if let Some(when) = guard_when
            && !when()
        {
            return Ok(());
        }
        if prompt.confirm(UNSAVED_PROMPT) {
            self.clear();
            Ok(())
        } else {
            Err(FormError::NavigationCancelled)
        }
    }

    fn run_submit(
        &self,
        submit: &SubmitFn,
        on_success: Option<&Rc<dyn Fn(&Value)>>,
        on_error: Option<&Rc<dyn Fn(&BoxError)>>,
    ) -> Result<Option<Value>, FormError> {
        if self.inner.submitting.replace(true) {
            log::warn!("submit requested while another is in flight; rejected");
            return Err(FormError::SubmitPending);
        }
        let result = submit(&self.get());
        self.inner.submitting.set(false);

        match result {
            Ok(Some(new_data)) => {
                self.commit(new_data.clone());
                if let Some(f) = on_success {
                    f(&new_data);
                }
                Ok(Some(new_data))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                if let Some(f) = on_error {
                    f(&err);
                    Ok(None)
                } else {
                    Err(FormError::Submit(err))
                }
            }
        }
    }

    fn release_guards(&self) {
        for guard in self.inner.guards.borrow_mut().drain(..) {
            guard.release();
        }
    }

    // Seed a field default the first time it is bound. Silent: defaulting
    // never flips dirty state.
    fn init_prop(&self, prop: &Path, default: Value) {
        if default.is_null() {
            return;
        }
        let missing = self
            .inner
            .store
            .get_path(prop)
            .is_none_or(|v| v.is_null());
        if missing {
            self.inner.store.set_path(prop, default, true);
        }
    }

    fn disabled_binding(&self) -> Binding<bool> {
        let edit = self.inner.is_edit.clone();
        Rc::new(move || !edit.get())
    }

    fn errors_binding(handler: &Rc<InputHandler>) -> Binding<Vec<String>> {
        let h = handler.clone();
        Rc::new(move || h.errors.with(|e| e.iter().cloned().collect()))
    }

    fn no_errors() -> Binding<Vec<String>> {
        Rc::new(|| Vec::new())
    }

    pub fn text(&self, cfg: TextConfig) -> Result<Field, FormError> {
        let prop = Path::parse(&cfg.prop)?;
        self.init_prop(&prop, Value::String(cfg.initial_value.clone()));

        let handler = InputHandler::new(
            self.store(),
            prop.clone(),
            cfg.validations,
            cfg.transform,
            InputMode::Validate,
        );
        let value = {
            let store = self.store();
            let initial = cfg.initial_value;
            Rc::new(move || {
                store
                    .get_path(&prop)
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_else(|| initial.clone())
            })
        };
        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::errors_binding(&handler),
            kind: FieldKind::Text {
                value,
                placeholder: cfg.placeholder,
                on_input: Rc::new(move |raw| {
                    handler.accept_text(raw);
                }),
            },
        })
    }

    pub fn float(&self, cfg: FloatConfig) -> Result<Field, FormError> {
        let prop = Path::parse(&cfg.prop)?;
        if let Some(n) = cfg.initial_value {
            let seed = serde_json::Number::from_f64(n)
                .ok_or_else(|| FormError::config("float initial value must be finite"))?;
            self.init_prop(&prop, Value::Number(seed));
        }

        let handler = InputHandler::new(
            self.store(),
            prop.clone(),
            cfg.validations,
            None,
            InputMode::Sanitize,
        );
        let value = {
            let store = self.store();
            Rc::new(move || {
                store
                    .get_path(&prop)
                    .map(|v| display_value(&v))
                    .unwrap_or_default()
            })
        };
        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::errors_binding(&handler),
            kind: FieldKind::Float {
                value,
                on_input: Rc::new(move |raw| handler.accept_text(raw)),
            },
        })
    }

    pub fn bool(&self, cfg: BoolConfig) -> Result<Field, FormError> {
        let prop = Path::parse(&cfg.prop)?;
        self.init_prop(&prop, Value::Bool(cfg.initial_value));

        let handler = InputHandler::new(
            self.store(),
            prop.clone(),
            Validations::None,
            None,
            InputMode::Validate,
        );
        let checked = {
            let store = self.store();
            let initial = cfg.initial_value;
            Rc::new(move || {
                store
                    .get_path(&prop)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(initial)
            })
        };
        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::errors_binding(&handler),
            kind: FieldKind::Bool {
                checked,
                on_input: Rc::new(move |b| {
                    handler.accept(Value::Bool(b));
                }),
            },
        })
    }

    pub fn drop_down(&self, cfg: DropDownConfig) -> Result<Field, FormError> {
        if cfg.options.is_empty() {
            return Err(FormError::config(format!(
                "drop-down at `{}` needs at least one option",
                cfg.prop
            )));
        }
        let prop = Path::parse(&cfg.prop)?;
        self.init_prop(&prop, Value::String(cfg.options[0].clone()));

        let handler = InputHandler::new(
            self.store(),
            prop.clone(),
            Validations::None,
            None,
            InputMode::Validate,
        );
        let selected = {
            let store = self.store();
            Rc::new(move || store.get_path(&prop).and_then(|v| v.as_str().map(String::from)))
        };
        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::errors_binding(&handler),
            kind: FieldKind::DropDown {
                options: cfg.options,
                selected,
                on_input: Rc::new(move |raw| {
                    handler.accept(Value::String(raw.to_string()));
                }),
            },
        })
    }

    pub fn date(&self, cfg: DateConfig) -> Result<Field, FormError> {
        let prop = Path::parse(&cfg.prop)?;
        let today = Local::now().date_naive();
        let min_year = cfg.min_year.unwrap_or(today.year() - 150);
        let max_year = cfg.max_year.unwrap_or(today.year());
        if min_year > max_year {
            return Err(FormError::config(format!(
                "date field at `{}`: min year {min_year} exceeds max year {max_year}",
                cfg.prop
            )));
        }

        let sync = DateSync::bind(
            self.store(),
            prop,
            cfg.initial_value.unwrap_or(today),
            min_year,
            max_year,
        )?;

        let part_input = |part: Part,
                          label: String,
                          min: Binding<i64>,
                          max: Binding<i64>,
                          value: Binding<i64>| {
            let s = sync.clone();
            PartInput {
                label,
                min,
                max,
                value,
                on_input: Rc::new(move |v| s.set_part(part, v)),
            }
        };

        let year = part_input(
            Part::Year,
            cfg.year_label.unwrap_or_else(|| "Year:".into()),
            constant(min_year as i64),
            constant(max_year as i64),
            {
                let s = sync.clone();
                Rc::new(move || s.parts.get().year as i64)
            },
        );
        let month = part_input(
            Part::Month,
            cfg.month_label.unwrap_or_else(|| "Month:".into()),
            constant(1),
            constant(12),
            {
                let s = sync.clone();
                Rc::new(move || s.parts.get().month as i64)
            },
        );
        let day = part_input(
            Part::Day,
            cfg.day_label.unwrap_or_else(|| "Day:".into()),
            constant(1),
            {
                let s = sync.clone();
                Rc::new(move || s.max_day.get() as i64)
            },
            {
                let s = sync.clone();
                Rc::new(move || s.parts.get().day as i64)
            },
        );

        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::no_errors(),
            kind: FieldKind::Date {
                style: cfg.style,
                year,
                month,
                day,
            },
        })
    }

    pub fn multiselect(&self, cfg: MultiSelectConfig) -> Result<Field, FormError> {
        let prop = Path::parse(&cfg.prop)?;
        match self.inner.store.get_path(&prop) {
            None | Some(Value::Null) => {
                let seed = Value::Array(
                    cfg.initial_value
                        .iter()
                        .map(|s| Value::String(s.clone()))
                        .collect(),
                );
                self.inner.store.set_path(&prop, seed, true);
            }
            Some(Value::Array(_)) => {}
            Some(other) => {
                return Err(FormError::config(format!(
                    "multiselect at `{prop}` expects an array, found `{other}`"
                )));
            }
        }

        let selected = {
            let store = self.store();
            let prop = prop.clone();
            Rc::new(move || collections::read_string_array(&store, &prop))
        };
        let on_toggle = {
            let store = self.store();
            Rc::new(move |option: &str| collections::toggle_option(&store, &prop, option))
        };
        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::no_errors(),
            kind: FieldKind::MultiSelect {
                options: cfg.options,
                selected,
                on_toggle,
            },
        })
    }

    pub fn tags(&self, cfg: TagsConfig) -> Result<Field, FormError> {
        let prop = Path::parse(&cfg.prop)?;
        let sync = TagSync::bind(
            self.store(),
            prop,
            &cfg.initial_value,
            cfg.wrap,
            cfg.unwrap,
        )?;

        let tags = {
            let s = sync.clone();
            Rc::new(move || s.tags())
        };
        let on_add = {
            let s = sync.clone();
            Rc::new(move |raw: &str| s.add(raw))
        };
        let on_remove = {
            let s = sync.clone();
            Rc::new(move |tag: &str| s.remove(tag))
        };
        let suggest: Rc<dyn Fn(&str) -> Vec<String>> = match cfg.lookup {
            Some(lookup) => {
                let s = sync.clone();
                Rc::new(move |query: &str| s.suggestions(query, &lookup))
            }
            None => Rc::new(|_| Vec::new()),
        };
        Ok(Field {
            title: cfg.title,
            name: cfg.prop,
            disabled: self.disabled_binding(),
            errors: Self::no_errors(),
            kind: FieldKind::Tags {
                tags,
                on_add,
                on_remove,
                suggest,
            },
        })
    }

    /// Collapsible group of fields. A group bound to a key shares one
    /// expand cell across renders; non-expandable groups are pinned open.
    pub fn group(&self, cfg: GroupConfig, children: Vec<Field>) -> Field {
        let expanded = match &cfg.expand_key {
            Some(key) => self.expanded(key),
            None => signal(false),
        };
        if !cfg.expandable {
            expanded.set(true);
        }

        let binding = {
            let e = expanded.clone();
            Rc::new(move || e.get())
        };
        let on_toggle = {
            let e = expanded;
            let expandable = cfg.expandable;
            Rc::new(move || {
                if expandable {
                    e.update(|v| *v = !*v);
                }
            })
        };
        Field {
            title: cfg.title,
            name: cfg.expand_key.unwrap_or_default(),
            disabled: constant(false),
            errors: Self::no_errors(),
            kind: FieldKind::Group {
                expandable: cfg.expandable,
                expanded: binding,
                on_toggle,
                children,
            },
        }
    }
}

pub struct TextConfig {
    pub title: Option<String>,
    pub prop: String,
    pub initial_value: String,
    pub placeholder: Option<String>,
    pub validations: Validations,
    pub transform: Option<Transform>,
}

impl TextConfig {
    pub fn new(prop: impl Into<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            initial_value: String::new(),
            placeholder: None,
            validations: Validations::None,
            transform: None,
        }
    }
}

pub struct FloatConfig {
    pub title: Option<String>,
    pub prop: String,
    pub initial_value: Option<f64>,
    pub validations: Validations,
}

impl FloatConfig {
    pub fn new(prop: impl Into<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            initial_value: None,
            validations: Validations::None,
        }
    }
}

pub struct BoolConfig {
    pub title: Option<String>,
    pub prop: String,
    pub initial_value: bool,
}

impl BoolConfig {
    pub fn new(prop: impl Into<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            initial_value: false,
        }
    }
}

pub struct DropDownConfig {
    pub title: Option<String>,
    pub prop: String,
    pub options: Vec<String>,
}

impl DropDownConfig {
    pub fn new(prop: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            options,
        }
    }
}

pub struct DateConfig {
    pub title: Option<String>,
    pub prop: String,
    pub initial_value: Option<NaiveDate>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub style: DatePartStyle,
    pub year_label: Option<String>,
    pub month_label: Option<String>,
    pub day_label: Option<String>,
}

impl DateConfig {
    pub fn new(prop: impl Into<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            initial_value: None,
            min_year: None,
            max_year: None,
            style: DatePartStyle::default(),
            year_label: None,
            month_label: None,
            day_label: None,
        }
    }
}

pub struct MultiSelectConfig {
    pub title: Option<String>,
    pub prop: String,
    pub options: Vec<String>,
    pub initial_value: Vec<String>,
}

impl MultiSelectConfig {
    pub fn new(prop: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            options,
            initial_value: Vec::new(),
        }
    }
}

pub struct TagsConfig {
    pub title: Option<String>,
    pub prop: String,
    pub initial_value: Vec<String>,
    pub wrap: Option<WrapFn>,
    pub unwrap: Option<UnwrapFn>,
    pub lookup: Option<LookupFn>,
}

impl TagsConfig {
    pub fn new(prop: impl Into<String>) -> Self {
        Self {
            title: None,
            prop: prop.into(),
            initial_value: Vec::new(),
            wrap: None,
            unwrap: None,
            lookup: None,
        }
    }
}

pub struct GroupConfig {
    pub title: Option<String>,
    pub expandable: bool,
    pub expand_key: Option<String>,
}

impl GroupConfig {
    pub fn new() -> Self {
        Self {
            title: None,
            expandable: true,
            expand_key: None,
        }
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self::new()
    }
}

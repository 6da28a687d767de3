use std::rc::Rc;

use reform_core::{ErrorList, Outcome, Path, PathStore, Signal, Validations, signal};
use serde_json::Value;

/// What a field does with raw input it does not like.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Run the validator pipeline; reject the edit on failure and keep the
    /// last-good stored value.
    #[default]
    Validate,
    /// Normalize the text first (the float policy) and commit whatever
    /// survives; the pipeline then runs on the sanitized value.
    Sanitize,
}

pub type Transform = Rc<dyn Fn(Value) -> Value>;

/// Per-field edit state machine. Two states: Valid commits on edit, Invalid
/// rejects the commit and retains the stored value. The validity cells are
/// live and outlive any single render pass.
pub struct InputHandler {
    store: PathStore,
    prop: Path,
    validations: Validations,
    transform: Option<Transform>,
    mode: InputMode,
    pub errors: Signal<ErrorList>,
    pub is_valid: Signal<bool>,
}

impl InputHandler {
    pub fn new(
        store: PathStore,
        prop: Path,
        validations: Validations,
        transform: Option<Transform>,
        mode: InputMode,
    ) -> Rc<Self> {
        Rc::new(Self {
            store,
            prop,
            validations,
            transform,
            mode,
            errors: signal(ErrorList::new()),
            is_valid: signal(true),
        })
    }

    /// Feed one raw edit through the pipeline. On pass the (transformed)
    /// value is committed non-silently, which marks the form dirty; on fail
    /// the stored value is untouched and the errors cell holds the messages.
    pub fn accept(&self, raw: Value) -> bool {
        let Outcome { is_valid, errors } = self.validations.run(&raw);
        if is_valid {
            let value = match &self.transform {
                Some(t) => t(raw),
                None => raw,
            };
            self.store.set_path(&self.prop, value, false);
            self.errors.set(ErrorList::new());
            self.is_valid.set(true);
        } else {
            log::debug!("edit rejected at {}: {} error(s)", self.prop, errors.len());
            self.errors.set(errors);
            self.is_valid.set(false);
        }
        self.is_valid.get()
    }

    /// Text-shaped entry point. Returns the text the input should display,
    /// which in sanitize mode may differ from what was typed.
    pub fn accept_text(&self, raw: &str) -> String {
        match self.mode {
            InputMode::Validate => {
                self.accept(Value::String(raw.to_string()));
                raw.to_string()
            }
            InputMode::Sanitize => match sanitize_decimal(raw) {
                Sanitized::Commit(display, value) => {
                    self.accept(value);
                    display
                }
                Sanitized::Transient(display) => display,
                Sanitized::Revert => self.stored_text(),
            },
        }
    }

    /// The stored value rendered back as input text.
    pub fn stored_text(&self) -> String {
        self.store
            .get_path(&self.prop)
            .map(|v| display_value(&v))
            .unwrap_or_default()
    }
}

pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => display_number(n.as_f64().unwrap_or(0.0)),
        other => other.to_string(),
    }
}

// "5" rather than "5.0": whole numbers drop the fraction.
pub(crate) fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Result of normalizing one decimal-input keystroke.
pub(crate) enum Sanitized {
    /// Display this text and commit this value.
    Commit(String, Value),
    /// Display this text; nothing committed yet (e.g. `"-"`, `"12."`).
    Transient(String),
    /// Unsalvageable; fall back to the last stored value.
    Revert,
}

/// Normalize partial or malformed decimal text.
///
/// Well-formed input commits as-is; an empty field commits null (cleared).
/// Runs of decimal points collapse to one, and a second dot-separated
/// segment is dropped entirely (`"12.3.4"` -> `"12.3"`). A trailing or
/// embedded non-numeric character reverts to the stored value.
pub(crate) fn sanitize_decimal(raw: &str) -> Sanitized {
    if raw.is_empty() {
        return Sanitized::Commit(String::new(), Value::Null);
    }
    if let Some(value) = parse_well_formed(raw) {
        return Sanitized::Commit(raw.to_string(), value);
    }
    if matches!(raw, "+" | "-" | ".") {
        return Sanitized::Transient(raw.to_string());
    }

    let mut collapsed = String::with_capacity(raw.len());
    let mut prev_dot = false;
    for c in raw.chars() {
        if c == '.' && prev_dot {
            continue;
        }
        prev_dot = c == '.';
        collapsed.push(c);
    }

    // keep everything before a second decimal point
    if let Some(first) = collapsed.find('.')
        && let Some(second) = collapsed[first + 1..].find('.')
    {
        collapsed.truncate(first + 1 + second);
    }

    match parse_well_formed(&collapsed) {
        Some(value) => Sanitized::Commit(collapsed, value),
        None if collapsed.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-')) => {
            // digits-and-punctuation that still is not a number, e.g. "12."
            Sanitized::Transient(collapsed)
        }
        None => Sanitized::Revert,
    }
}

// The accepted shape: [+-]? digits* ('.' digits+)? with at least one
// trailing digit, so "12", ".5", "+1.25" pass and "5." does not.
fn parse_well_formed(s: &str) -> Option<Value> {
    let rest = s.strip_prefix(['+', '-']).unwrap_or(s);
    if rest.is_empty() {
        return None;
    }
    let (int, frac) = match rest.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (rest, None),
    };
    if !int.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    } else if int.is_empty() {
        return None;
    }
    let n: f64 = s.parse().ok()?;
    serde_json::Number::from_f64(n).map(Value::Number)
}

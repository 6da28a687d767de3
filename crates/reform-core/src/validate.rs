use std::rc::Rc;

use serde_json::Value;
use smallvec::SmallVec;

/// What a single validator says about a raw value.
pub enum Verdict {
    Pass,
    Fail(String),
    FailAll(Vec<String>),
}

pub type Validator = Rc<dyn Fn(&Value) -> Verdict>;

/// Error messages for one field; almost always 0–2 entries.
pub type ErrorList = SmallVec<[String; 2]>;

/// A field's validation setup: nothing, one validator, or an ordered chain.
#[derive(Clone, Default)]
pub enum Validations {
    #[default]
    None,
    Single(Validator),
    Chain(Vec<Validator>),
}

pub struct Outcome {
    pub is_valid: bool,
    pub errors: ErrorList,
}

impl Outcome {
    fn pass() -> Self {
        Self { is_valid: true, errors: ErrorList::new() }
    }
}

impl Validations {
    /// Run the pipeline against a raw value.
    ///
    /// `Single` surfaces its messages. `Chain` runs *every* validator (no
    /// short-circuit) and ANDs the verdicts, but contributes no
    /// per-validator messages; only the boolean survives. That asymmetry is
    /// long-standing observed behavior and is kept as-is.
    pub fn run(&self, value: &Value) -> Outcome {
        match self {
            Validations::None => Outcome::pass(),
            Validations::Single(v) => match v(value) {
                Verdict::Pass => Outcome::pass(),
                Verdict::Fail(msg) => Outcome {
                    is_valid: false,
                    errors: ErrorList::from_iter([msg]),
                },
                Verdict::FailAll(msgs) => Outcome {
                    is_valid: false,
                    errors: ErrorList::from_iter(msgs),
                },
            },
            Validations::Chain(chain) => {
                let mut is_valid = true;
                for v in chain {
                    if !matches!(v(value), Verdict::Pass) {
                        is_valid = false;
                    }
                }
                Outcome { is_valid, errors: ErrorList::new() }
            }
        }
    }
}

fn as_text(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Rejects null, and strings that are empty after trimming.
pub fn required() -> Validator {
    Rc::new(|value| match value {
        Value::Null => Verdict::Fail("a value is required".into()),
        Value::String(s) if s.trim().is_empty() => {
            Verdict::Fail("a value is required".into())
        }
        _ => Verdict::Pass,
    })
}

pub fn min_len(min: usize) -> Validator {
    Rc::new(move |value| match as_text(value) {
        Some(s) if s.chars().count() < min => {
            Verdict::Fail(format!("must be at least {min} characters"))
        }
        _ => Verdict::Pass,
    })
}

pub fn max_len(max: usize) -> Validator {
    Rc::new(move |value| match as_text(value) {
        Some(s) if s.chars().count() > max => {
            Verdict::Fail(format!("must be at most {max} characters"))
        }
        _ => Verdict::Pass,
    })
}

/// Rejects numbers that are not finite (and non-numbers entirely).
pub fn finite_number() -> Validator {
    Rc::new(|value| match value.as_f64() {
        Some(n) if n.is_finite() => Verdict::Pass,
        _ => Verdict::Fail("must be a number".into()),
    })
}

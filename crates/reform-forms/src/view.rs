use std::rc::Rc;

use reform_core::FormError;
use serde_json::Value;

/// Reactive attribute binding: the renderer re-evaluates it whenever the
/// cell behind it changes.
pub type Binding<T> = Rc<dyn Fn() -> T>;

pub fn constant<T: Copy + 'static>(v: T) -> Binding<T> {
    Rc::new(move || v)
}

/// Declarative description of one bound field, consumed by an external
/// renderer. The engine owns the handlers and bindings; the renderer owns
/// pixels.
pub struct Field {
    pub title: Option<String>,
    /// The bound path, rendered as the input's name.
    pub name: String,
    pub disabled: Binding<bool>,
    pub errors: Binding<Vec<String>>,
    pub kind: FieldKind,
}

pub enum FieldKind {
    Text {
        value: Binding<String>,
        placeholder: Option<String>,
        on_input: Rc<dyn Fn(&str)>,
    },
    /// Sanitize-and-accept numeric text. `on_input` returns the text the
    /// renderer should show, which may differ from what was typed.
    Float {
        value: Binding<String>,
        on_input: Rc<dyn Fn(&str) -> String>,
    },
    Bool {
        checked: Binding<bool>,
        on_input: Rc<dyn Fn(bool)>,
    },
    DropDown {
        options: Vec<String>,
        selected: Binding<Option<String>>,
        on_input: Rc<dyn Fn(&str)>,
    },
    Date {
        style: DatePartStyle,
        year: PartInput,
        month: PartInput,
        day: PartInput,
    },
    MultiSelect {
        options: Vec<String>,
        selected: Binding<Vec<String>>,
        on_toggle: Rc<dyn Fn(&str)>,
    },
    Tags {
        tags: Binding<Vec<String>>,
        /// False when the tag was rejected (duplicate or empty).
        on_add: Rc<dyn Fn(&str) -> bool>,
        on_remove: Rc<dyn Fn(&str)>,
        suggest: Rc<dyn Fn(&str) -> Vec<String>>,
    },
    Group {
        expandable: bool,
        expanded: Binding<bool>,
        on_toggle: Rc<dyn Fn()>,
        children: Vec<Field>,
    },
}

/// How a date sub-part is edited. Both affordances share the one edit path,
/// so bounds and bound-recompute timing are identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DatePartStyle {
    Stepper,
    #[default]
    DropDown,
}

/// One sub-input of a composite date field.
pub struct PartInput {
    pub label: String,
    pub min: Binding<i64>,
    pub max: Binding<i64>,
    pub value: Binding<i64>,
    pub on_input: Rc<dyn Fn(i64)>,
}

/// The bound form surface: its children plus the submit handler.
pub struct FormView {
    pub children: Vec<Field>,
    pub on_submit: Rc<dyn Fn() -> Result<Option<Value>, FormError>>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text { placeholder, .. } => f
                .debug_struct("Text")
                .field("placeholder", placeholder)
                .finish(),
            FieldKind::Float { .. } => write!(f, "Float"),
            FieldKind::Bool { .. } => write!(f, "Bool"),
            FieldKind::DropDown { options, .. } => f
                .debug_struct("DropDown")
                .field("options", options)
                .finish(),
            FieldKind::Date { style, .. } => {
                f.debug_struct("Date").field("style", style).finish()
            }
            FieldKind::MultiSelect { options, .. } => f
                .debug_struct("MultiSelect")
                .field("options", options)
                .finish(),
            FieldKind::Tags { .. } => write!(f, "Tags"),
            FieldKind::Group { children, .. } => f
                .debug_struct("Group")
                .field("children", children)
                .finish(),
        }
    }
}

//! Field-input generator: one input specification per field definition.

use std::collections::HashSet;
use std::fmt;

use sha2::{Digest, Sha256};

use super::types::{FieldDefinition, FieldKind, OptionList, Template};

/// Placeholder option leading a foreign choice control.
pub const SELECT_PLACEHOLDER: &str = "(select)";
/// Placeholder option shown when the space list could not be fetched.
pub const SPACES_FAILED_PLACEHOLDER: &str = "(failed to load spaces)";

/// Stable identifier tying a rendered control to its definition.
///
/// Derived from the owning template and the field name, which is unique
/// within a template, so the same field gets the same id on every render and
/// a submitted form can be matched back regardless of control order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(String);

impl FieldId {
    pub fn derive(template: &Template, field: &FieldDefinition) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(template.id.to_le_bytes());
        hasher.update(template.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(field.name.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("cf-{}", hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Temporal picker flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Date,
    Time,
    DateTime,
}

impl Temporal {
    /// HTML `type` attribute for the picker.
    pub fn input_type(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime-local",
        }
    }
}

/// Where a choice control's options come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSource {
    /// The definition's own `options`.
    Template,
    /// Records of a foreign collection (spaces).
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    fn same(text: &str) -> Self {
        Self {
            value: text.to_string(),
            label: text.to_string(),
        }
    }
}

/// The control generated for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Checkbox,
    Number,
    Temporal(Temporal),
    Choice {
        source: ChoiceSource,
        choices: Vec<Choice>,
    },
    /// Free text; the placeholder is the raw field type.
    Text { placeholder: String },
}

impl Control {
    /// Value a fresh control holds before any user input or pre-fill.
    pub fn default_value(&self) -> ControlValue {
        match self {
            Self::Checkbox => ControlValue::Checked(false),
            Self::Choice { choices, .. } => ControlValue::Text(
                choices.first().map(|c| c.value.clone()).unwrap_or_default(),
            ),
            _ => ControlValue::Text(String::new()),
        }
    }

    /// Whether `value` is selectable in this control.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Choice { choices, .. } => choices.iter().any(|c| c.value == value),
            _ => true,
        }
    }
}

/// Current state of one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Checked(bool),
    Text(String),
}

/// Everything needed to render and read back one field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub id: FieldId,
    /// Rendering position of the definition within its template.
    pub position: usize,
    /// Name of the definition; also the control's visible label.
    pub name: String,
    pub kind: FieldKind,
    pub control: Control,
}

/// Foreign lists a generator may draw from. Fetched before rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub spaces: OptionList,
}

impl RenderContext {
    pub fn with_spaces(spaces: OptionList) -> Self {
        Self { spaces }
    }
}

type Generator = fn(&FieldDefinition, &RenderContext) -> Control;

/// Handler table: one generator per field kind.
fn generator_for(kind: &FieldKind) -> Generator {
    match kind {
        FieldKind::Boolean => checkbox_control,
        FieldKind::Number => number_control,
        FieldKind::Date => date_control,
        FieldKind::Time => time_control,
        FieldKind::DateTime => datetime_control,
        FieldKind::Select => select_control,
        FieldKind::Space => space_control,
        FieldKind::Text | FieldKind::User | FieldKind::Unknown(_) => text_control,
    }
}

fn checkbox_control(_field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Checkbox
}

fn number_control(_field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Number
}

fn date_control(_field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Temporal(Temporal::Date)
}

fn time_control(_field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Temporal(Temporal::Time)
}

fn datetime_control(_field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Temporal(Temporal::DateTime)
}

fn select_control(field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Choice {
        source: ChoiceSource::Template,
        choices: field.options.iter().map(|o| Choice::same(o)).collect(),
    }
}

fn space_control(_field: &FieldDefinition, ctx: &RenderContext) -> Control {
    let choices = if ctx.spaces.is_failed() {
        vec![Choice {
            value: String::new(),
            label: SPACES_FAILED_PLACEHOLDER.to_string(),
        }]
    } else {
        std::iter::once(Choice {
            value: String::new(),
            label: SELECT_PLACEHOLDER.to_string(),
        })
        .chain(ctx.spaces.options().iter().map(|o| Choice {
            value: o.id.to_string(),
            label: o.label.clone(),
        }))
        .collect()
    };
    Control::Choice {
        source: ChoiceSource::Foreign,
        choices,
    }
}

fn text_control(field: &FieldDefinition, _ctx: &RenderContext) -> Control {
    Control::Text {
        placeholder: field.field_type.as_str().to_string(),
    }
}

/// Generate the input specification for one field at `position`.
pub fn generate_input(
    template: &Template,
    field: &FieldDefinition,
    position: usize,
    ctx: &RenderContext,
) -> InputSpec {
    InputSpec {
        id: FieldId::derive(template, field),
        position,
        name: field.name.clone(),
        kind: field.field_type.clone(),
        control: generator_for(&field.field_type)(field, ctx),
    }
}

/// Generate inputs for every field of `template`, in definition order.
///
/// A template that breaks name uniqueness still gets one distinct id per
/// control: repeated names are suffixed with their position.
pub fn generate_inputs(template: &Template, ctx: &RenderContext) -> Vec<InputSpec> {
    let mut seen = HashSet::new();
    template
        .fields
        .iter()
        .enumerate()
        .map(|(position, field)| {
            let mut input = generate_input(template, field, position, ctx);
            if !seen.insert(input.id.clone()) {
                input.id = FieldId(format!("{}-{}", input.id, position));
                seen.insert(input.id.clone());
            }
            input
        })
        .collect()
}

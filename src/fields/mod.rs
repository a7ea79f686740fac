//! Dynamic field form engine.
//!
//! A template fetched from the server (an activity type or a space template)
//! carries an ordered list of field definitions. This module turns that list
//! into typed inputs, reads their values back as a generic name/value list,
//! and maps stored values onto the inputs when a record is edited.
//!
//! ```text
//!  Template ──generate_inputs()──> Vec<InputSpec> ──html::render_fields()──> HTML
//!                                        │
//!      stored values ──prefill()──>  FieldSet state  <──apply()── Submission
//!                                        │
//!                                   extract() ──> Vec<CustomFieldValue>
//! ```
//!
//! | Module    | Responsibility                                          |
//! |-----------|---------------------------------------------------------|
//! | `types`   | `FieldKind`, `FieldDefinition`, `Template`, values      |
//! | `input`   | Field-input generator and stable `FieldId`s             |
//! | `extract` | Read controls back into `CustomFieldValue`s             |
//! | `prefill` | Stored values onto controls (edit mode)                 |
//! | `editor`  | Template field rows: option parsing and required checks |
//! | `html`    | Handlebars template for a `FieldSet`'s input container  |

pub mod editor;
pub mod extract;
pub mod html;
pub mod input;
pub mod prefill;
pub mod types;

use std::collections::HashMap;

pub use extract::{InputSource, Submission, extract};
pub use input::{Control, ControlValue, FieldId, InputSpec, RenderContext, generate_inputs};
pub use prefill::prefill;
pub use types::{
    CustomFieldValue, FieldDefinition, FieldKind, FieldValue, ForeignOption, OptionList,
    Template, TemplateKind,
};

use crate::errors::FormError;

/// The rendered inputs of one template together with their current state.
#[derive(Debug, Clone)]
pub struct FieldSet {
    template: Template,
    inputs: Vec<InputSpec>,
    values: HashMap<FieldId, ControlValue>,
}

impl FieldSet {
    /// Generate inputs for `template`, every control at its default.
    pub fn render(template: &Template, ctx: &RenderContext) -> Self {
        let inputs = generate_inputs(template, ctx);
        let values = prefill(&inputs, &[]);
        Self {
            template: template.clone(),
            inputs,
            values,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn input(&self, id: &FieldId) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| &i.id == id)
    }

    /// Input generated for the definition called `name`.
    pub fn input_named(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn value(&self, id: &FieldId) -> Option<&ControlValue> {
        self.values.get(id)
    }

    /// Replace all control state with `stored`, as when opening a record.
    pub fn prefill(&mut self, stored: &[CustomFieldValue]) {
        self.values = prefill(&self.inputs, stored);
    }

    /// Set a control's value the way a user edit would.
    pub fn set(&mut self, id: &FieldId, value: ControlValue) -> Result<(), FormError> {
        let input = self.input(id).ok_or_else(|| FormError::InvalidValue {
            field: id.to_string(),
            message: "no such field".into(),
        })?;
        check_fit(input, &value)?;
        self.values.insert(id.clone(), value);
        Ok(())
    }

    /// Set a control by definition name. Convenience for programmatic use.
    pub fn set_named(&mut self, name: &str, value: ControlValue) -> Result<(), FormError> {
        let id = self
            .input_named(name)
            .map(|i| i.id.clone())
            .ok_or_else(|| FormError::InvalidValue {
                field: name.to_string(),
                message: "no such field".into(),
            })?;
        self.set(&id, value)
    }

    /// Take over the values a browser posted for these inputs. A posted
    /// value the control cannot hold resets it to its default.
    pub fn apply(&mut self, submission: &Submission) {
        for input in &self.inputs {
            if let Some(value) = submission.read(input) {
                let value = match check_fit(input, &value) {
                    Ok(()) => value,
                    Err(_) => input.control.default_value(),
                };
                self.values.insert(input.id.clone(), value);
            }
        }
    }

    /// Current values as custom fields, in definition order.
    pub fn extract(&self) -> Vec<CustomFieldValue> {
        extract(&self.inputs, &self.values)
    }
}

/// Whether `value` fits the control of `input`.
fn check_fit(input: &InputSpec, value: &ControlValue) -> Result<(), FormError> {
    match (&input.control, value) {
        (Control::Checkbox, ControlValue::Checked(_)) => Ok(()),
        (Control::Checkbox, ControlValue::Text(_)) | (_, ControlValue::Checked(_)) => {
            Err(FormError::InvalidValue {
                field: input.name.clone(),
                message: "value does not fit the control".into(),
            })
        }
        (control, ControlValue::Text(text)) if !control.accepts(text) => {
            Err(FormError::InvalidValue {
                field: input.name.clone(),
                message: format!("'{}' is not one of the choices", text),
            })
        }
        _ => Ok(()),
    }
}

//! Pre-fill for edit mode: stored values back onto freshly generated inputs.

use std::collections::HashMap;

use super::input::{Control, ControlValue, FieldId, InputSpec};
use super::types::{CustomFieldValue, FieldValue};

/// Compute the initial state of every input from a record's stored values.
///
/// Values are matched by field name; when a name repeats in `stored`, the
/// last occurrence wins. Inputs without a usable stored value keep their
/// control default, and stored names unknown to the template are ignored.
pub fn prefill(inputs: &[InputSpec], stored: &[CustomFieldValue]) -> HashMap<FieldId, ControlValue> {
    let by_name: HashMap<&str, &FieldValue> = stored
        .iter()
        .map(|cf| (cf.name.as_str(), &cf.value))
        .collect();

    inputs
        .iter()
        .map(|input| {
            let value = by_name
                .get(input.name.as_str())
                .and_then(|stored| coerce(&input.control, stored))
                .unwrap_or_else(|| input.control.default_value());
            (input.id.clone(), value)
        })
        .collect()
}

/// Convert a stored value into the state `control` can display, if any.
fn coerce(control: &Control, stored: &FieldValue) -> Option<ControlValue> {
    match (control, stored) {
        (_, FieldValue::Null) => None,
        (Control::Checkbox, FieldValue::Bool(b)) => Some(ControlValue::Checked(*b)),
        (Control::Checkbox, FieldValue::Text(s)) => Some(ControlValue::Checked(is_truthy(s))),
        (control, FieldValue::Text(s)) if control.accepts(s) => Some(ControlValue::Text(s.clone())),
        (control, FieldValue::Bool(b)) if control.accepts(&b.to_string()) => {
            Some(ControlValue::Text(b.to_string()))
        }
        _ => None,
    }
}

fn is_truthy(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

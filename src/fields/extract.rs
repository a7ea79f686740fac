//! Value extraction: rendered inputs back to a name/value list.
//!
//! Booleans are always reported, since an unchecked box is a real answer.
//! Every other kind is dropped when its control is empty: absence means "not
//! provided", never "cleared to empty".

use std::collections::HashMap;

use super::input::{Control, ControlValue, FieldId, InputSpec};
use super::types::{CustomFieldValue, FieldValue};

/// Anything that can report the current state of a rendered control.
pub trait InputSource {
    fn read(&self, input: &InputSpec) -> Option<ControlValue>;
}

impl InputSource for HashMap<FieldId, ControlValue> {
    fn read(&self, input: &InputSpec) -> Option<ControlValue> {
        self.get(&input.id).cloned()
    }
}

/// Urlencoded pairs as posted by an HTML form.
///
/// Browsers leave unchecked checkboxes out of the submission entirely, so a
/// missing checkbox key reads as unchecked.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pairs: Vec<(String, String)>,
}

impl Submission {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value posted under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed, non-empty value posted under `key`.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Every value posted under `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }
}

impl From<Vec<(String, String)>> for Submission {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

impl InputSource for Submission {
    fn read(&self, input: &InputSpec) -> Option<ControlValue> {
        let key = input.id.as_str();
        match input.control {
            Control::Checkbox => Some(ControlValue::Checked(self.contains(key))),
            _ => self.get(key).map(|v| ControlValue::Text(v.to_string())),
        }
    }
}

/// Read every input, in rendering order, into custom field values.
pub fn extract<S: InputSource + ?Sized>(inputs: &[InputSpec], source: &S) -> Vec<CustomFieldValue> {
    inputs
        .iter()
        .filter_map(|input| {
            let value = match (&input.control, source.read(input)) {
                (Control::Checkbox, Some(ControlValue::Checked(checked))) => {
                    FieldValue::Bool(checked)
                }
                (Control::Checkbox, _) => FieldValue::Bool(false),
                (_, Some(ControlValue::Text(text))) => FieldValue::Text(text),
                (_, Some(ControlValue::Checked(_))) | (_, None) => FieldValue::Null,
            };
            if !input.kind.is_boolean() && value.is_empty() {
                return None;
            }
            Some(CustomFieldValue {
                name: input.name.clone(),
                value,
            })
        })
        .collect()
}

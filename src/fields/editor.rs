//! Template editor rows: the admin-side view of a template's fields.

use std::collections::HashSet;

use serde::Serialize;

use super::types::{FieldDefinition, FieldKind, Template, TemplateKind};
use crate::errors::FormError;

/// One editable row as entered in the template editor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldRow {
    pub name: String,
    pub field_type: String,
    /// Comma-separated choices, as typed.
    pub options: String,
}

impl FieldRow {
    pub fn from_definition(field: &FieldDefinition) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type.to_string(),
            options: field.options.join(", "),
        }
    }
}

/// Field payload as the template collections accept it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPayload {
    pub name: String,
    pub field_type: FieldKind,
    pub options: Option<Vec<String>>,
}

/// Create/update body for a template collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub kind: TemplateKind,
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldPayload>,
}

impl TemplateDraft {
    /// JSON body, with the descriptor under the key this kind uses.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("name".into(), self.name.clone().into());
        body.insert(
            self.kind.description_key().into(),
            self.description.clone().into(),
        );
        body.insert(
            "fields".into(),
            serde_json::to_value(&self.fields).unwrap_or_default(),
        );
        serde_json::Value::Object(body)
    }
}

/// Split a comma-separated option string into trimmed, non-empty choices.
///
/// Returns `None` when nothing is left, which the server stores as "no
/// options".
pub fn parse_options(raw: &str) -> Option<Vec<String>> {
    let options: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    (!options.is_empty()).then_some(options)
}

/// Rows for an existing template, or none for a new one.
pub fn rows_for(template: Option<&Template>) -> Vec<FieldRow> {
    template
        .map(|t| t.fields.iter().map(FieldRow::from_definition).collect())
        .unwrap_or_default()
}

/// Turn editor rows into field payloads, enforcing the required rules.
pub fn build_fields(rows: &[FieldRow]) -> Result<Vec<FieldPayload>, FormError> {
    let mut seen = HashSet::new();
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let name = row.name.trim();
            if name.is_empty() {
                return Err(FormError::EmptyFieldName { index });
            }
            if !seen.insert(name.to_string()) {
                return Err(FormError::DuplicateFieldName {
                    name: name.to_string(),
                });
            }
            let field_type = FieldKind::from(row.field_type.trim());
            let options = parse_options(&row.options);
            if field_type == FieldKind::Select && options.is_none() {
                return Err(FormError::SelectWithoutOptions {
                    name: name.to_string(),
                });
            }
            Ok(FieldPayload {
                name: name.to_string(),
                field_type,
                options,
            })
        })
        .collect()
}

//! HTML rendering for generated inputs.
//!
//! Each field becomes `<div class="tf" data-field-id="...">` holding a label
//! and one control whose `name` is the field id, so a posted form maps back
//! to definitions by id alone. Rendering goes through handlebars, which
//! escapes every `{{value}}` it interpolates.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use super::FieldSet;
use super::input::{Control, ControlValue, InputSpec};

/// Registry name of the field container template.
pub const FIELDS_TEMPLATE: &str = "fields";

const FIELDS: &str = concat!(
    r#"<h4>Template: {{template}}</h4><div id="templateFields">"#,
    r#"{{#each rows}}<div class="tf" data-field-id="{{id}}"><label>{{name}}: "#,
    r#"{{#if checkbox}}<input data-field-id="{{id}}" name="{{id}}" class="tfinput" type="checkbox" value="on"{{#if checked}} checked{{/if}} />{{/if}}"#,
    r#"{{#if select}}<select data-field-id="{{id}}" name="{{id}}" class="tfinput">{{#each choices}}<option value="{{value}}"{{#if selected}} selected{{/if}}>{{label}}</option>{{/each}}</select>{{/if}}"#,
    r#"{{#if input_type}}<input data-field-id="{{id}}" name="{{id}}" class="tfinput" type="{{input_type}}" value="{{value}}"{{#if placeholder}} placeholder="{{placeholder}}"{{/if}} />{{/if}}"#,
    r#"</label></div>{{/each}}</div>"#,
);

#[derive(Serialize)]
struct FieldsView<'a> {
    template: &'a str,
    rows: Vec<RowView<'a>>,
}

#[derive(Serialize)]
struct RowView<'a> {
    id: &'a str,
    name: &'a str,
    checkbox: bool,
    checked: bool,
    select: bool,
    choices: Vec<ChoiceView<'a>>,
    input_type: Option<&'a str>,
    value: &'a str,
    placeholder: Option<&'a str>,
}

#[derive(Serialize)]
struct ChoiceView<'a> {
    value: &'a str,
    label: &'a str,
    selected: bool,
}

/// Add the field container template to `hb`.
pub fn register(hb: &mut Handlebars<'_>) -> Result<(), TemplateError> {
    hb.register_template_string(FIELDS_TEMPLATE, FIELDS)
}

/// A registry holding only the field container template.
pub fn registry() -> Result<Handlebars<'static>, TemplateError> {
    let mut hb = Handlebars::new();
    register(&mut hb)?;
    Ok(hb)
}

/// Render the field container for `set`: the template heading followed by
/// one row per input.
pub fn render_fields(hb: &Handlebars<'_>, set: &FieldSet) -> Result<String, RenderError> {
    let view = FieldsView {
        template: &set.template().name,
        rows: set
            .inputs()
            .iter()
            .map(|input| row_view(input, set.value(&input.id)))
            .collect(),
    };
    hb.render(FIELDS_TEMPLATE, &view)
}

fn row_view<'a>(input: &'a InputSpec, value: Option<&'a ControlValue>) -> RowView<'a> {
    let text = match value {
        Some(ControlValue::Text(t)) => t.as_str(),
        _ => "",
    };
    let mut row = RowView {
        id: input.id.as_str(),
        name: &input.name,
        checkbox: false,
        checked: false,
        select: false,
        choices: Vec::new(),
        input_type: None,
        value: text,
        placeholder: None,
    };
    match &input.control {
        Control::Checkbox => {
            row.checkbox = true;
            row.checked = matches!(value, Some(ControlValue::Checked(true)));
        }
        Control::Number => row.input_type = Some("number"),
        Control::Temporal(t) => row.input_type = Some(t.input_type()),
        Control::Text { placeholder } => {
            row.input_type = Some("text");
            row.placeholder = Some(placeholder.as_str());
        }
        Control::Choice { choices, .. } => {
            row.select = true;
            row.choices = choices
                .iter()
                .map(|c| ChoiceView {
                    value: &c.value,
                    label: &c.label,
                    selected: c.value == text,
                })
                .collect();
        }
    }
    row
}

//! Server-rendered pages of the console.
//!
//! Every page is a handlebars template registered once in [`Pages`]. Pieces
//! rendered on their own (core inputs, foreign selects, the field container)
//! are spliced into their page with `{{{...}}}`; everything else is escaped.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde_json::{Value, json};

use crate::fields::editor::FieldRow;
use crate::fields::html;
use crate::fields::input::{SELECT_PLACEHOLDER, SPACES_FAILED_PLACEHOLDER};
use crate::fields::{OptionList, Submission, TemplateKind};
use crate::form::{FormSession, TemplateChoices};

use super::records::TEMPLATE_KEY;

pub const TEMPLATES_FAILED_PLACEHOLDER: &str = "(templates load failed)";
pub const BUILDINGS_FAILED_PLACEHOLDER: &str = "(failed to load buildings)";
pub const USERS_FAILED_PLACEHOLDER: &str = "(failed to load users)";

/// Posted key of the button that was pressed.
pub const ACTION_KEY: &str = "action";
pub const ACTION_SWITCH: &str = "switch";
pub const ACTION_SUBMIT: &str = "submit";
pub const ACTION_ADD_ROW: &str = "add_row";
pub const ACTION_REMOVE_ROW: &str = "remove:";

const LAYOUT: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{{title}}</title><link rel="stylesheet" href="/console.css"></head>
<body>
<nav><a href="/">Back-office</a> · <a href="/activities/new">New activity</a> · <a href="/spaces/new">New space</a> · <a href="/templates/activity/new">New activity type</a> · <a href="/templates/space/new">New space template</a></nav>
<main>{{{body}}}</main>
</body>
</html>"#;

const INDEX: &str =
    "<h2>Back-office console</h2><p>Pick a form from the navigation above.</p>";

const NOTICES: &str = r#"{{#if notice}}<p class="notice">{{notice}}</p>{{/if}}{{#if error}}<p class="error">{{error}}</p>{{/if}}"#;

const RECORD: &str = concat!(
    r#"<h2>{{heading}}</h2>{{> notices}}
<form method="post" action="{{action}}">
<input type="hidden" name="action" value="submit" />
{{{core}}}
"#,
    r#"<label>Template: <select name="{{template_key}}" onchange="this.form.elements.action[0].value='switch';this.form.submit()">"#,
    r#"{{#if templates_failed}}<option value="">{{templates_failed}}</option>{{else}}<option value="">(none)</option>{{#each templates}}<option value="{{id}}"{{#if selected}} selected{{/if}}>{{name}}</option>{{/each}}{{/if}}"#,
    r#"</select></label> <button type="submit" name="action" value="switch">Apply</button><br/>
{{{fields}}}
<button type="submit" name="action" value="submit">Save</button>
</form>"#,
);

const FOREIGN_SELECT: &str = r#"<select name="{{name}}">{{#if failed}}<option value="">{{failed}}</option>{{else}}<option value="">{{placeholder}}</option>{{#each options}}<option value="{{id}}"{{#if selected}} selected{{/if}}>{{label}}</option>{{/each}}{{/if}}</select>"#;

const ACTIVITY_CORE: &str = r#"<input name="title" type="text" value="{{title}}" placeholder="title" /><br/>
<label>Category ID: <input name="category_id" type="number" value="{{category_id}}" placeholder="category id" /></label><br/>
<label>Organizer: {{#if organizer_select}}{{{organizer_select}}}{{else}}<input name="organizer_user_id" type="number" value="{{organizer_user_id}}" placeholder="user id" /> {{users_failed}}{{/if}}</label><br/>
<label>Start: <input name="start_time" type="datetime-local" value="{{start_time}}" /></label><br/>
<label>End: <input name="end_time" type="datetime-local" value="{{end_time}}" /></label><br/>
<label>Space: {{{space_select}}}</label><br/>"#;

const SPACE_CORE: &str = r#"<label>Building: {{{building_select}}}</label><br/>
<input name="name" type="text" value="{{name}}" placeholder="name" /><br/>
<input name="type" type="text" value="{{type}}" placeholder="type" /><br/>
<input name="capacity" type="number" value="{{capacity}}" placeholder="capacity" /><br/>"#;

const EDITOR: &str = concat!(
    r#"<h2>{{heading}}</h2>{{> notices}}
<form method="post" action="{{action}}">
<label>Name: <input name="name" value="{{name}}" /></label><br/>
<label>Description: <input name="description" value="{{description}}" /></label><br/>
<div id="fieldRows">"#,
    r#"{{#each rows}}<div class="fieldRow"><input name="field_name" placeholder="name" value="{{name}}" /> <select name="field_type">{{#each types}}<option value="{{value}}"{{#if selected}} selected{{/if}}>{{value}}</option>{{/each}}</select> <input name="field_options" placeholder="options (comma separated)" value="{{options}}" /> <button type="submit" name="action" value="{{remove}}">Remove</button></div>{{/each}}"#,
    r#"</div>
<button type="submit" name="action" value="add_row">Add field</button>
<button type="submit" name="action" value="submit">Save</button>
</form>
{{#if delete}}<form method="post" action="{{delete}}"><button type="submit">Delete</button></form>{{/if}}"#,
);

const ERROR: &str = r#"<h2>Error {{status}}</h2><p class="error">{{message}}</p>"#;

/// Everything a record form page shows besides its core inputs.
pub struct RecordPage<'a> {
    pub heading: &'a str,
    pub action: &'a str,
    pub core: String,
    pub session: &'a FormSession,
    pub notice: Option<&'a str>,
}

/// Template editor state as shown on its page.
pub struct EditorPage<'a> {
    pub kind: TemplateKind,
    pub id: Option<i64>,
    pub name: &'a str,
    pub description: &'a str,
    pub rows: &'a [FieldRow],
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

/// The console's page templates.
pub struct Pages {
    hb: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, TemplateError> {
        let mut hb = Handlebars::new();
        html::register(&mut hb)?;
        hb.register_template_string("layout", LAYOUT)?;
        hb.register_template_string("notices", NOTICES)?;
        hb.register_template_string("record", RECORD)?;
        hb.register_template_string("foreign_select", FOREIGN_SELECT)?;
        hb.register_template_string("activity_core", ACTIVITY_CORE)?;
        hb.register_template_string("space_core", SPACE_CORE)?;
        hb.register_template_string("editor", EDITOR)?;
        hb.register_template_string("error", ERROR)?;
        Ok(Self { hb })
    }

    fn page(&self, title: &str, name: &str, data: &Value) -> Result<String, RenderError> {
        let body = self.hb.render(name, data)?;
        self.layout(title, &body)
    }

    fn layout(&self, title: &str, body: &str) -> Result<String, RenderError> {
        self.hb
            .render("layout", &json!({ "title": title, "body": body }))
    }

    pub fn index(&self) -> Result<String, RenderError> {
        self.layout("Back-office", INDEX)
    }

    pub fn record(&self, page: RecordPage<'_>) -> Result<String, RenderError> {
        let session = page.session;
        let fields = match session.fields() {
            Some(set) => html::render_fields(&self.hb, set)?,
            None => String::new(),
        };
        let selected = session.selected_template();
        let (templates_failed, templates) = match session.templates() {
            TemplateChoices::Failed => (Some(TEMPLATES_FAILED_PLACEHOLDER), Vec::new()),
            TemplateChoices::Loaded(templates) => (
                None,
                templates
                    .iter()
                    .map(|t| json!({ "id": t.id, "name": t.name, "selected": selected == Some(t.id) }))
                    .collect(),
            ),
        };
        let data = json!({
            "heading": page.heading,
            "action": page.action,
            "notice": page.notice,
            "error": session.error(),
            "core": page.core,
            "template_key": TEMPLATE_KEY,
            "templates_failed": templates_failed,
            "templates": templates,
            "fields": fields,
        });
        self.page(page.heading, "record", &data)
    }

    /// A `<select>` over foreign records, degrading to a single placeholder
    /// when the list failed to load.
    pub fn foreign_select(
        &self,
        name: &str,
        list: &OptionList,
        selected: Option<&str>,
        failed: &str,
    ) -> Result<String, RenderError> {
        let options: Vec<Value> = list
            .options()
            .iter()
            .map(|o| {
                let id = o.id.to_string();
                json!({ "selected": selected == Some(id.as_str()), "id": id, "label": o.label })
            })
            .collect();
        self.hb.render(
            "foreign_select",
            &json!({
                "name": name,
                "failed": list.is_failed().then_some(failed),
                "placeholder": SELECT_PLACEHOLDER,
                "options": options,
            }),
        )
    }

    /// Core inputs of the activity form, filled from `values`.
    pub fn activity_core(
        &self,
        values: &Submission,
        spaces: &OptionList,
        users: &OptionList,
    ) -> Result<String, RenderError> {
        let organizer_select = if users.is_failed() {
            None
        } else {
            Some(self.foreign_select(
                "organizer_user_id",
                users,
                values.get("organizer_user_id"),
                USERS_FAILED_PLACEHOLDER,
            )?)
        };
        let space_select = self.foreign_select(
            "space_id",
            spaces,
            values.get("space_id"),
            SPACES_FAILED_PLACEHOLDER,
        )?;
        self.hb.render(
            "activity_core",
            &json!({
                "title": values.get("title"),
                "category_id": values.get("category_id"),
                "organizer_user_id": values.get("organizer_user_id"),
                "organizer_select": organizer_select,
                "users_failed": USERS_FAILED_PLACEHOLDER,
                "start_time": values.get("start_time"),
                "end_time": values.get("end_time"),
                "space_select": space_select,
            }),
        )
    }

    /// Core inputs of the space form, filled from `values`.
    pub fn space_core(
        &self,
        values: &Submission,
        buildings: &OptionList,
    ) -> Result<String, RenderError> {
        let building_select = self.foreign_select(
            "building_id",
            buildings,
            values.get("building_id"),
            BUILDINGS_FAILED_PLACEHOLDER,
        )?;
        self.hb.render(
            "space_core",
            &json!({
                "building_select": building_select,
                "name": values.get("name"),
                "type": values.get("type"),
                "capacity": values.get("capacity"),
            }),
        )
    }

    pub fn editor(&self, page: EditorPage<'_>) -> Result<String, RenderError> {
        let slug = kind_slug(page.kind);
        let heading = match page.id {
            Some(id) => format!("Edit {} #{}", kind_label(page.kind), id),
            None => format!("New {}", kind_label(page.kind)),
        };
        let action = match page.id {
            Some(id) => format!("/templates/{}/{}/edit", slug, id),
            None => format!("/templates/{}/new", slug),
        };
        let rows: Vec<Value> = page
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| editor_row(page.kind, i, row))
            .collect();
        let data = json!({
            "heading": heading,
            "action": action,
            "notice": page.notice,
            "error": page.error,
            "name": page.name,
            "description": page.description,
            "rows": rows,
            "delete": page.id.map(|id| format!("/templates/{}/{}/delete", slug, id)),
        });
        self.page(&heading, "editor", &data)
    }

    pub fn error(&self, status: u16, message: &str) -> Result<String, RenderError> {
        self.page(
            "Error",
            "error",
            &json!({ "status": status, "message": message }),
        )
    }
}

/// One editor row: the kind's field types, plus the row's own type when it
/// is not among them.
fn editor_row(kind: TemplateKind, index: usize, row: &FieldRow) -> Value {
    let mut types: Vec<&str> = kind.editor_kinds().iter().map(|k| k.as_str()).collect();
    if !row.field_type.is_empty() && !types.contains(&row.field_type.as_str()) {
        types.push(&row.field_type);
    }
    let types: Vec<Value> = types
        .into_iter()
        .map(|t| json!({ "value": t, "selected": t == row.field_type }))
        .collect();
    json!({
        "name": row.name,
        "options": row.options,
        "types": types,
        "remove": format!("{}{}", ACTION_REMOVE_ROW, index),
    })
}

pub fn kind_slug(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::ActivityType => "activity",
        TemplateKind::SpaceTemplate => "space",
    }
}

fn kind_label(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::ActivityType => "activity type",
        TemplateKind::SpaceTemplate => "space template",
    }
}

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use handlebars::TemplateError;
use tracing::{info, warn};

use super::pages::{
    self, ACTION_ADD_ROW, ACTION_KEY, ACTION_REMOVE_ROW, ACTION_SUBMIT, ACTION_SWITCH,
    EditorPage, Pages, RecordPage,
};
use super::records::{ActivityCore, SpaceCore, selected_template};
use crate::client::{Backend, Space};
use crate::errors::{ConsoleError, FormError};
use crate::fields::editor::{FieldRow, TemplateDraft, build_fields, rows_for};
use crate::fields::{CustomFieldValue, OptionList, RenderContext, Submission, TemplateKind};
use crate::form::{FormSession, Outcome, TemplateChoices};

const TRACING_TARGET: &str = "backoffice::console";

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub pages: Pages,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>) -> Result<Self, TemplateError> {
        Ok(Self {
            backend,
            pages: Pages::new()?,
        })
    }
}

pub type SharedState = Arc<AppState>;

type Pairs = Vec<(String, String)>;

// ── Error handling ────────────────────────────────────────────────────

/// Message of a failed request, turned into the error page on the way out.
#[derive(Debug, Clone)]
struct ErrorNotice(String);

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = match &self {
            ConsoleError::NotFound(_) => StatusCode::NOT_FOUND,
            ConsoleError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ConsoleError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ConsoleError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.to_string();
        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorNotice(message));
        response
    }
}

/// Replace the plain-text body of a `ConsoleError` response with the error
/// page. Keeps the plain body if the page itself fails to render.
async fn render_error_page(State(state): State<SharedState>, response: Response) -> Response {
    let Some(ErrorNotice(message)) = response.extensions().get::<ErrorNotice>().cloned() else {
        return response;
    };
    let status = response.status();
    match state.pages.error(status.as_u16(), &message) {
        Ok(page) => (status, Html(page)).into_response(),
        Err(e) => {
            warn!(target: TRACING_TARGET, error = %e, "error page failed to render");
            response
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn console_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/activities/new", get(new_activity).post(submit_activity))
        .route("/spaces/new", get(new_space).post(submit_space))
        .route("/spaces/{id}/edit", get(edit_space).post(submit_space_edit))
        .route(
            "/templates/{kind}/new",
            get(new_template).post(submit_new_template),
        )
        .route(
            "/templates/{kind}/{id}/edit",
            get(edit_template).post(submit_template_edit),
        )
        .route("/templates/{kind}/{id}/delete", post(delete_template))
        .layer(middleware::map_response_with_state(
            state.clone(),
            render_error_page,
        ))
        .with_state(state)
}

// ── Helpers ───────────────────────────────────────────────────────────

async fn load_templates(state: &AppState, kind: TemplateKind) -> TemplateChoices {
    match state.backend.list_templates(kind).await {
        Ok(templates) => TemplateChoices::Loaded(templates),
        Err(e) => {
            warn!(target: TRACING_TARGET, kind = kind.as_str(), error = %e, "template fetch failed");
            TemplateChoices::Failed
        }
    }
}

async fn load_spaces(state: &AppState) -> OptionList {
    match state.backend.list_spaces().await {
        Ok(spaces) => OptionList::Loaded(spaces.iter().map(Space::to_option).collect()),
        Err(e) => {
            warn!(target: TRACING_TARGET, error = %e, "space fetch failed");
            OptionList::Failed
        }
    }
}

async fn load_users(state: &AppState) -> OptionList {
    match state.backend.list_users().await {
        Ok(users) => OptionList::Loaded(users.iter().map(|u| u.to_option()).collect()),
        Err(e) => {
            warn!(target: TRACING_TARGET, error = %e, "user fetch failed");
            OptionList::Failed
        }
    }
}

async fn load_buildings(state: &AppState) -> OptionList {
    match state.backend.list_buildings().await {
        Ok(buildings) => OptionList::Loaded(
            buildings
                .into_iter()
                .map(|b| crate::fields::ForeignOption {
                    id: b.id,
                    label: b.name,
                })
                .collect(),
        ),
        Err(e) => {
            warn!(target: TRACING_TARGET, error = %e, "building fetch failed");
            OptionList::Failed
        }
    }
}

/// A fresh form instance with `selected` rendered. A failed template fetch
/// leaves the form open without fields; so does a template that no longer
/// exists, with the error shown.
fn open_session(
    templates: TemplateChoices,
    ctx: RenderContext,
    stored: Vec<CustomFieldValue>,
    selected: Option<i64>,
) -> Result<FormSession, FormError> {
    let mut session = FormSession::new();
    session.open_for_edit(templates, ctx, stored);
    if !session.templates().is_failed() {
        if let Err(e) = session.select_template(selected) {
            warn!(target: TRACING_TARGET, template_id = ?selected, error = %e, "template not applied");
            session.show_error(e.to_string())?;
        }
    }
    Ok(session)
}

/// Status to block a submission with when the posted template is not the
/// one rendered: the template list failed to load, or the template is gone.
fn unapplied_template(
    session: &mut FormSession,
    requested: Option<i64>,
) -> Result<Option<StatusCode>, FormError> {
    let Some(id) = requested else {
        return Ok(None);
    };
    if session.selected_template() == Some(id) {
        return Ok(None);
    }
    if session.templates().is_failed() {
        session.show_error(format!(
            "Templates could not be loaded, so template {} was not applied. Nothing was saved.",
            id
        ))?;
        return Ok(Some(StatusCode::BAD_GATEWAY));
    }
    Ok(Some(StatusCode::UNPROCESSABLE_ENTITY))
}

fn pressed<'a>(sub: &'a Submission) -> impl Iterator<Item = &'a str> + 'a {
    sub.get_all(ACTION_KEY)
}

fn is_switch(sub: &Submission) -> bool {
    pressed(sub).any(|a| a == ACTION_SWITCH)
}

fn notice(query: &Submission) -> Option<&'static str> {
    if query.contains("created") {
        Some("Created.")
    } else if query.contains("saved") {
        Some("Saved.")
    } else if query.contains("deleted") {
        Some("Deleted.")
    } else {
        None
    }
}

fn parse_kind(raw: &str) -> Result<TemplateKind, ConsoleError> {
    TemplateKind::from_str(raw).map_err(ConsoleError::BadRequest)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn index(State(state): State<SharedState>) -> Result<Html<String>, ConsoleError> {
    Ok(Html(state.pages.index()?))
}

// ── Activities ────────────────────────────────────────────────────────

struct ActivityOptions {
    spaces: OptionList,
    users: OptionList,
}

async fn activity_session(
    state: &AppState,
    selected: Option<i64>,
) -> Result<(FormSession, ActivityOptions), FormError> {
    let (templates, spaces, users) = tokio::join!(
        load_templates(state, TemplateKind::ActivityType),
        load_spaces(state),
        load_users(state),
    );
    let session = open_session(
        templates,
        RenderContext::with_spaces(spaces.clone()),
        Vec::new(),
        selected,
    )?;
    Ok((session, ActivityOptions { spaces, users }))
}

fn activity_page(
    pages: &Pages,
    session: &FormSession,
    values: &Submission,
    options: &ActivityOptions,
    notice: Option<&str>,
) -> Result<Html<String>, ConsoleError> {
    let page = pages.record(RecordPage {
        heading: "New activity",
        action: "/activities/new",
        core: pages.activity_core(values, &options.spaces, &options.users)?,
        session,
        notice,
    })?;
    Ok(Html(page))
}

async fn new_activity(
    State(state): State<SharedState>,
    Query(query): Query<Pairs>,
) -> Result<Html<String>, ConsoleError> {
    let query = Submission::new(query);
    let (session, options) = activity_session(&state, selected_template(&query)?).await?;
    activity_page(&state.pages, &session, &query, &options, notice(&query))
}

async fn submit_activity(
    State(state): State<SharedState>,
    Form(pairs): Form<Pairs>,
) -> Result<Response, ConsoleError> {
    let sub = Submission::new(pairs);
    let requested = selected_template(&sub)?;
    let (mut session, options) = activity_session(&state, requested).await?;
    let render = |session: &FormSession| activity_page(&state.pages, session, &sub, &options, None);
    if is_switch(&sub) {
        return Ok(render(&session)?.into_response());
    }
    if let Some(status) = unapplied_template(&mut session, requested)? {
        return Ok((status, render(&session)?).into_response());
    }
    session.apply(&sub)?;

    let core = match ActivityCore::from_submission(&sub) {
        Ok(core) => core,
        Err(e) => {
            session.show_error(e.to_string())?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&session)?).into_response());
        }
    };

    let ticket = session.begin_submit()?;
    let template = session.fields().map(|f| f.template().clone());
    let draft = core.into_draft(template.as_ref(), ticket.custom_fields.clone());
    let result = state.backend.create_activity(&draft).await;
    if let Err(e) = &result {
        warn!(target: TRACING_TARGET, error = %e, "activity create failed");
    }
    match session.finish(&ticket, result.map_err(|e| e.to_string())) {
        Outcome::Closed => {
            info!(target: TRACING_TARGET, title = %draft.title, "activity created");
            Ok(Redirect::to("/activities/new?created=1").into_response())
        }
        Outcome::Reopened | Outcome::Discarded => {
            Ok((StatusCode::BAD_GATEWAY, render(&session)?).into_response())
        }
    }
}

// ── Spaces ────────────────────────────────────────────────────────────

/// Core values of a stored space, shaped like a posted form.
fn space_values(space: &Space) -> Submission {
    let mut pairs = vec![
        ("building_id".to_string(), space.building_id.to_string()),
        ("name".to_string(), space.name.clone()),
        ("type".to_string(), space.space_type.clone().unwrap_or_default()),
    ];
    if let Some(capacity) = space.capacity {
        pairs.push(("capacity".to_string(), capacity.to_string()));
    }
    Submission::new(pairs)
}

async fn space_session(
    state: &AppState,
    stored: Vec<CustomFieldValue>,
    selected: Option<i64>,
) -> Result<(FormSession, OptionList), FormError> {
    let (templates, buildings) = tokio::join!(
        load_templates(state, TemplateKind::SpaceTemplate),
        load_buildings(state),
    );
    let session = open_session(templates, RenderContext::default(), stored, selected)?;
    Ok((session, buildings))
}

fn space_page(
    pages: &Pages,
    session: &FormSession,
    space_id: Option<i64>,
    values: &Submission,
    buildings: &OptionList,
    notice: Option<&str>,
) -> Result<Html<String>, ConsoleError> {
    let (heading, action) = match space_id {
        Some(id) => (format!("Edit space #{}", id), format!("/spaces/{}/edit", id)),
        None => ("New space".to_string(), "/spaces/new".to_string()),
    };
    let page = pages.record(RecordPage {
        heading: &heading,
        action: &action,
        core: pages.space_core(values, buildings)?,
        session,
        notice,
    })?;
    Ok(Html(page))
}

async fn find_space(state: &AppState, id: i64) -> Result<Space, ConsoleError> {
    state
        .backend
        .find_space(id)
        .await?
        .ok_or_else(|| ConsoleError::NotFound(format!("Space {} not found", id)))
}

async fn new_space(
    State(state): State<SharedState>,
    Query(query): Query<Pairs>,
) -> Result<Html<String>, ConsoleError> {
    let query = Submission::new(query);
    let (session, buildings) =
        space_session(&state, Vec::new(), selected_template(&query)?).await?;
    space_page(&state.pages, &session, None, &query, &buildings, notice(&query))
}

async fn edit_space(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<Pairs>,
) -> Result<Html<String>, ConsoleError> {
    let query = Submission::new(query);
    let space = find_space(&state, id).await?;
    let selected = selected_template(&query)?.or(space.space_template_id);
    let (session, buildings) = space_session(&state, space.custom_fields.clone(), selected).await?;
    space_page(
        &state.pages,
        &session,
        Some(id),
        &space_values(&space),
        &buildings,
        notice(&query),
    )
}

async fn submit_space(
    State(state): State<SharedState>,
    Form(pairs): Form<Pairs>,
) -> Result<Response, ConsoleError> {
    save_space(&state, None, Submission::new(pairs)).await
}

async fn submit_space_edit(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Form(pairs): Form<Pairs>,
) -> Result<Response, ConsoleError> {
    save_space(&state, Some(id), Submission::new(pairs)).await
}

async fn save_space(
    state: &AppState,
    id: Option<i64>,
    sub: Submission,
) -> Result<Response, ConsoleError> {
    let stored = match id {
        Some(id) => find_space(state, id).await?.custom_fields,
        None => Vec::new(),
    };
    let requested = selected_template(&sub)?;
    let (mut session, buildings) = space_session(state, stored, requested).await?;
    let render = |session: &FormSession| space_page(&state.pages, session, id, &sub, &buildings, None);
    if is_switch(&sub) {
        return Ok(render(&session)?.into_response());
    }
    if let Some(status) = unapplied_template(&mut session, requested)? {
        return Ok((status, render(&session)?).into_response());
    }
    session.apply(&sub)?;

    let core = match SpaceCore::from_submission(&sub) {
        Ok(core) => core,
        Err(e) => {
            session.show_error(e.to_string())?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&session)?).into_response());
        }
    };

    let ticket = session.begin_submit()?;
    let template = session.fields().map(|f| f.template().clone());
    let custom_fields = ticket.custom_fields.clone();
    let (draft, result) = match id {
        Some(id) => {
            let draft = core.into_update(template.as_ref(), custom_fields);
            let result = state.backend.update_space(id, &draft).await;
            (draft, result)
        }
        None => {
            let draft = core.into_draft(template.as_ref(), custom_fields);
            let result = state.backend.create_space(&draft).await;
            (draft, result)
        }
    };
    if let Err(e) = &result {
        warn!(target: TRACING_TARGET, space_id = ?id, error = %e, "space save failed");
    }
    match session.finish(&ticket, result.map_err(|e| e.to_string())) {
        Outcome::Closed => {
            info!(target: TRACING_TARGET, space_id = ?id, name = %draft.name, "space saved");
            let to = match id {
                Some(id) => format!("/spaces/{}/edit?saved=1", id),
                None => "/spaces/new?created=1".to_string(),
            };
            Ok(Redirect::to(&to).into_response())
        }
        Outcome::Reopened | Outcome::Discarded => {
            Ok((StatusCode::BAD_GATEWAY, render(&session)?).into_response())
        }
    }
}

// ── Template editor ───────────────────────────────────────────────────

/// Editor rows as posted: parallel `field_name`/`field_type`/`field_options`.
fn editor_rows(sub: &Submission) -> Vec<FieldRow> {
    let types: Vec<&str> = sub.get_all("field_type").collect();
    let options: Vec<&str> = sub.get_all("field_options").collect();
    sub.get_all("field_name")
        .enumerate()
        .map(|(i, name)| FieldRow {
            name: name.to_string(),
            field_type: types.get(i).copied().unwrap_or("text").to_string(),
            options: options.get(i).copied().unwrap_or_default().to_string(),
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn render_editor(
    pages: &Pages,
    kind: TemplateKind,
    id: Option<i64>,
    name: &str,
    description: &str,
    rows: &[FieldRow],
    error: Option<&str>,
    notice: Option<&str>,
) -> Result<Html<String>, ConsoleError> {
    let page = pages.editor(EditorPage {
        kind,
        id,
        name,
        description,
        rows,
        error,
        notice,
    })?;
    Ok(Html(page))
}

async fn new_template(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Query(query): Query<Pairs>,
) -> Result<Html<String>, ConsoleError> {
    let kind = parse_kind(&kind)?;
    let query = Submission::new(query);
    render_editor(&state.pages, kind, None, "", "", &[], None, notice(&query))
}

async fn edit_template(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, i64)>,
    Query(query): Query<Pairs>,
) -> Result<Html<String>, ConsoleError> {
    let kind = parse_kind(&kind)?;
    let query = Submission::new(query);
    let templates = state.backend.list_templates(kind).await?;
    let template = templates
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| ConsoleError::NotFound(format!("Template {} not found", id)))?;
    render_editor(
        &state.pages,
        kind,
        Some(id),
        &template.name,
        template.description.as_deref().unwrap_or_default(),
        &rows_for(Some(template)),
        None,
        notice(&query),
    )
}

async fn submit_new_template(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Form(pairs): Form<Pairs>,
) -> Result<Response, ConsoleError> {
    let kind = parse_kind(&kind)?;
    save_template(&state, kind, None, Submission::new(pairs)).await
}

async fn submit_template_edit(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, i64)>,
    Form(pairs): Form<Pairs>,
) -> Result<Response, ConsoleError> {
    let kind = parse_kind(&kind)?;
    save_template(&state, kind, Some(id), Submission::new(pairs)).await
}

async fn save_template(
    state: &AppState,
    kind: TemplateKind,
    id: Option<i64>,
    sub: Submission,
) -> Result<Response, ConsoleError> {
    let name = sub.get("name").unwrap_or_default().trim().to_string();
    let description = sub.get("description").unwrap_or_default().trim().to_string();
    let mut rows = editor_rows(&sub);
    let render = |rows: &[FieldRow], error: Option<&str>| {
        render_editor(&state.pages, kind, id, &name, &description, rows, error, None)
    };

    let mut action = ACTION_SUBMIT;
    for a in pressed(&sub) {
        if a != ACTION_SUBMIT {
            action = a;
        }
    }
    if action == ACTION_ADD_ROW {
        rows.push(FieldRow {
            field_type: "text".into(),
            ..FieldRow::default()
        });
        return Ok(render(&rows, None)?.into_response());
    }
    if let Some(index) = action.strip_prefix(ACTION_REMOVE_ROW) {
        if let Ok(index) = index.parse::<usize>() {
            if index < rows.len() {
                rows.remove(index);
            }
        }
        return Ok(render(&rows, None)?.into_response());
    }

    let checked = if name.is_empty() {
        Err(FormError::MissingRequired {
            field: "Name".into(),
        })
    } else {
        build_fields(&rows)
    };
    let fields = match checked {
        Ok(fields) => fields,
        Err(e) => {
            let page = render(&rows, Some(&e.to_string()))?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let draft = TemplateDraft {
        kind,
        name: name.clone(),
        description: description.clone(),
        fields,
    };
    match state.backend.save_template(id, &draft).await {
        Ok(()) => {
            info!(target: TRACING_TARGET, kind = kind.as_str(), template_id = ?id, name = %name, "template saved");
            let to = match id {
                Some(id) => format!("/templates/{}/{}/edit?saved=1", pages::kind_slug(kind), id),
                None => format!("/templates/{}/new?saved=1", pages::kind_slug(kind)),
            };
            Ok(Redirect::to(&to).into_response())
        }
        Err(e) => {
            warn!(target: TRACING_TARGET, kind = kind.as_str(), error = %e, "template save failed");
            let page = render(&rows, Some(&e.to_string()))?;
            Ok((StatusCode::BAD_GATEWAY, page).into_response())
        }
    }
}

async fn delete_template(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Redirect, ConsoleError> {
    let kind = parse_kind(&kind)?;
    state.backend.delete_template(kind, id).await?;
    info!(target: TRACING_TARGET, kind = kind.as_str(), template_id = id, "template deleted");
    Ok(Redirect::to(&format!(
        "/templates/{}/new?deleted=1",
        pages::kind_slug(kind)
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::client::{ActivityDraft, Building, SpaceDraft, User};
    use crate::errors::ClientError;
    use crate::fields::{FieldDefinition, FieldId, FieldKind, Template};

    #[derive(Default)]
    struct StubBackend {
        fail_templates: bool,
        fail_writes: bool,
        activities: Mutex<Vec<ActivityDraft>>,
        spaces: Mutex<Vec<(Option<i64>, SpaceDraft)>>,
        templates: Mutex<Vec<(Option<i64>, serde_json::Value)>>,
        deleted: Mutex<Vec<(TemplateKind, i64)>>,
    }

    fn booking_type() -> Template {
        Template {
            id: 1,
            name: "Booking".into(),
            description: Some("with room".into()),
            fields: vec![
                FieldDefinition::new("Room", FieldKind::Space),
                FieldDefinition::new("Catering", FieldKind::Boolean),
            ],
        }
    }

    fn room_template() -> Template {
        Template {
            id: 2,
            name: "Room".into(),
            description: None,
            fields: vec![
                FieldDefinition::new("Capacity", FieldKind::Number),
                FieldDefinition::new("HasProjector", FieldKind::Boolean),
            ],
        }
    }

    fn upstream_error(path: &str) -> ClientError {
        ClientError::Status {
            status: 500,
            path: path.into(),
            body: "boom".into(),
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn list_templates(&self, kind: TemplateKind) -> Result<Vec<Template>, ClientError> {
            if self.fail_templates {
                return Err(upstream_error(kind.collection_path()));
            }
            Ok(match kind {
                TemplateKind::ActivityType => vec![booking_type()],
                TemplateKind::SpaceTemplate => vec![room_template()],
            })
        }

        async fn list_spaces(&self) -> Result<Vec<Space>, ClientError> {
            Ok(vec![Space {
                id: 4,
                building_id: 1,
                name: "Hall".into(),
                space_type: Some("auditorium".into()),
                capacity: Some(200),
                space_template_id: Some(2),
                custom_fields: vec![
                    CustomFieldValue::new("Capacity", "200"),
                    CustomFieldValue::new("HasProjector", true),
                ],
            }])
        }

        async fn list_buildings(&self) -> Result<Vec<Building>, ClientError> {
            Err(upstream_error("/logistics/buildings"))
        }

        async fn list_users(&self) -> Result<Vec<User>, ClientError> {
            Ok(vec![User {
                id: 2,
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
            }])
        }

        async fn create_activity(&self, draft: &ActivityDraft) -> Result<(), ClientError> {
            if self.fail_writes {
                return Err(upstream_error("/activities/"));
            }
            self.activities.lock().unwrap().push(draft.clone());
            Ok(())
        }

        async fn create_space(&self, draft: &SpaceDraft) -> Result<(), ClientError> {
            self.spaces.lock().unwrap().push((None, draft.clone()));
            Ok(())
        }

        async fn update_space(&self, id: i64, draft: &SpaceDraft) -> Result<(), ClientError> {
            self.spaces.lock().unwrap().push((Some(id), draft.clone()));
            Ok(())
        }

        async fn save_template(
            &self,
            id: Option<i64>,
            draft: &TemplateDraft,
        ) -> Result<(), ClientError> {
            self.templates.lock().unwrap().push((id, draft.to_json()));
            Ok(())
        }

        async fn delete_template(&self, kind: TemplateKind, id: i64) -> Result<(), ClientError> {
            self.deleted.lock().unwrap().push((kind, id));
            Ok(())
        }
    }

    fn test_app(backend: Arc<StubBackend>) -> Router {
        console_router(Arc::new(AppState::new(backend).unwrap()))
    }

    async fn body_text(body: Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_post(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+").replace(':', "%3A")))
            .collect::<Vec<_>>()
            .join("&");
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn activity_core() -> Vec<(&'static str, &'static str)> {
        vec![
            ("title", "Standup"),
            ("category_id", "1"),
            ("organizer_user_id", "2"),
            ("start_time", "2026-03-01T09:00"),
            ("end_time", "2026-03-01T09:15"),
        ]
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app(Arc::default());
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response.into_body()).await, "ok");
    }

    #[tokio::test]
    async fn test_new_activity_with_template_renders_fields() {
        let app = test_app(Arc::default());
        let response = app.oneshot(get("/activities/new?template_id=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("Template: Booking"));
        assert!(html.contains("Hall (auditorium)"));
        assert!(html.contains("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_failed_template_fetch_still_renders_form() {
        let backend = Arc::new(StubBackend {
            fail_templates: true,
            ..StubBackend::default()
        });
        let app = test_app(backend);
        let response = app.oneshot(get("/activities/new?template_id=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert!(html.contains(pages::TEMPLATES_FAILED_PLACEHOLDER));
        assert!(html.contains(r#"name="title""#));
    }

    #[tokio::test]
    async fn test_missing_space_blocks_submission() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let response = app
            .oneshot(form_post("/activities/new", &activity_core()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("Space is required"));
        assert!(backend.activities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activity_without_template_sends_space_field() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let mut pairs = activity_core();
        pairs.push(("space_id", "4"));
        let response = app.oneshot(form_post("/activities/new", &pairs)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let sent = backend.activities.lock().unwrap();
        assert_eq!(sent[0].custom_fields, vec![CustomFieldValue::new("space", "4")]);
        assert_eq!(sent[0].activity_type_id, None);
    }

    #[tokio::test]
    async fn test_activity_with_template_falls_back_to_form_space() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let catering = FieldId::derive(&booking_type(), &booking_type().fields[1]).to_string();
        let mut pairs = activity_core();
        pairs.push(("space_id", "4"));
        pairs.push(("template_id", "1"));
        pairs.push((catering.as_str(), "on"));
        let response = app.oneshot(form_post("/activities/new", &pairs)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let sent = backend.activities.lock().unwrap();
        assert_eq!(sent[0].activity_type_id, Some(1));
        assert_eq!(
            sent[0].custom_fields,
            vec![
                CustomFieldValue::new("Room", "4"),
                CustomFieldValue::new("Catering", true),
            ]
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_form_populated() {
        let backend = Arc::new(StubBackend {
            fail_writes: true,
            ..StubBackend::default()
        });
        let app = test_app(backend);
        let mut pairs = activity_core();
        pairs.push(("space_id", "4"));
        let response = app.oneshot(form_post("/activities/new", &pairs)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("HTTP 500 from /activities/: boom"));
        assert!(html.contains(r#"value="Standup""#));
    }

    #[tokio::test]
    async fn test_edit_space_prefills_stored_values() {
        let app = test_app(Arc::default());
        let response = app.oneshot(get("/spaces/4/edit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("Template: Room"));
        assert!(html.contains(r#"value="200""#));
        assert!(html.contains(" checked"));
        assert!(html.contains(pages::BUILDINGS_FAILED_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_edit_unknown_space_is_not_found() {
        let app = test_app(Arc::default());
        let response = app.oneshot(get("/spaces/99/edit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("<h2>Error 404</h2>"));
        assert!(html.contains(r#"<p class="error">Space 99 not found</p>"#));
    }

    #[tokio::test]
    async fn test_space_edit_patches_with_template_fields() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let capacity = FieldId::derive(&room_template(), &room_template().fields[0]).to_string();
        let response = app
            .oneshot(form_post(
                "/spaces/4/edit",
                &[
                    ("building_id", "1"),
                    ("name", "Hall"),
                    ("type", "auditorium"),
                    ("template_id", "2"),
                    (capacity.as_str(), "150"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let sent = backend.spaces.lock().unwrap();
        let (id, draft) = &sent[0];
        assert_eq!(*id, Some(4));
        assert_eq!(draft.space_template_id, Some(2));
        assert_eq!(
            draft.custom_fields,
            Some(vec![
                CustomFieldValue::new("Capacity", "150"),
                CustomFieldValue::new("HasProjector", false),
            ])
        );
    }

    #[tokio::test]
    async fn test_space_edit_without_template_leaves_stored_fields() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let response = app
            .oneshot(form_post(
                "/spaces/4/edit",
                &[("building_id", "1"), ("name", "Hall"), ("template_id", "")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let sent = backend.spaces.lock().unwrap();
        assert_eq!(sent[0].1.space_template_id, None);
        assert_eq!(sent[0].1.custom_fields, None);
    }

    #[tokio::test]
    async fn test_submit_with_unloadable_template_is_blocked() {
        let backend = Arc::new(StubBackend {
            fail_templates: true,
            ..StubBackend::default()
        });
        let app = test_app(backend.clone());
        let mut pairs = activity_core();
        pairs.push(("space_id", "4"));
        pairs.push(("template_id", "1"));
        let response = app.oneshot(form_post("/activities/new", &pairs)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("template 1 was not applied. Nothing was saved."));
        assert!(html.contains(r#"value="Standup""#));
        assert!(backend.activities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_with_unknown_template_keeps_input() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let mut pairs = activity_core();
        pairs.push(("space_id", "4"));
        pairs.push(("template_id", "99"));
        let response = app.oneshot(form_post("/activities/new", &pairs)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response.into_body()).await;
        assert!(html.contains(r#"<p class="error">Template 99 not found</p>"#));
        assert!(html.contains(r#"value="Standup""#));
        assert!(!html.contains(r#"id="templateFields""#));
        assert!(backend.activities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_space_save_with_unloadable_template_is_blocked() {
        let backend = Arc::new(StubBackend {
            fail_templates: true,
            ..StubBackend::default()
        });
        let app = test_app(backend.clone());
        let response = app
            .oneshot(form_post(
                "/spaces/new",
                &[("building_id", "1"), ("name", "Lab"), ("template_id", "2")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(backend.spaces.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_switch_action_rerenders_without_saving() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let response = app
            .oneshot(form_post(
                "/spaces/new",
                &[("name", "Lab"), ("template_id", "2"), ("action", "switch")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert!(html.contains("Template: Room"));
        assert!(html.contains(r#"value="Lab""#));
        assert!(backend.spaces.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_template_editor_checks_required_rules() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let response = app
            .oneshot(form_post(
                "/templates/activity/new",
                &[
                    ("name", "Workshop"),
                    ("field_name", "Level"),
                    ("field_type", "select"),
                    ("field_options", " , "),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(backend.templates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_template_editor_saves_parsed_options() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let response = app
            .oneshot(form_post(
                "/templates/activity/1/edit",
                &[
                    ("name", "Workshop"),
                    ("description", "hands-on"),
                    ("field_name", "Level"),
                    ("field_type", "select"),
                    ("field_options", "A, B,,"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let saved = backend.templates.lock().unwrap();
        let (id, body) = &saved[0];
        assert_eq!(*id, Some(1));
        assert_eq!(body["metadata"], "hands-on");
        assert_eq!(body["fields"][0]["options"], serde_json::json!(["A", "B"]));
    }

    #[tokio::test]
    async fn test_template_editor_adds_and_removes_rows() {
        let app = test_app(Arc::default());
        let response = app
            .clone()
            .oneshot(form_post(
                "/templates/space/new",
                &[("name", "Room"), ("action", "add_row")],
            ))
            .await
            .unwrap();
        let html = body_text(response.into_body()).await;
        assert_eq!(html.matches(r#"class="fieldRow""#).count(), 1);

        let response = app
            .oneshot(form_post(
                "/templates/space/new",
                &[
                    ("name", "Room"),
                    ("field_name", "A"),
                    ("field_type", "text"),
                    ("field_options", ""),
                    ("action", "remove:0"),
                ],
            ))
            .await
            .unwrap();
        let html = body_text(response.into_body()).await;
        assert_eq!(html.matches(r#"class="fieldRow""#).count(), 0);
    }

    #[tokio::test]
    async fn test_edit_template_prefills_rows() {
        let app = test_app(Arc::default());
        let response = app.oneshot(get("/templates/space/2/edit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert!(html.contains(r#"value="Capacity""#));
        assert!(html.contains(r#"<option value="number" selected>number</option>"#));
    }

    #[tokio::test]
    async fn test_delete_template_and_bad_kind() {
        let backend = Arc::new(StubBackend::default());
        let app = test_app(backend.clone());
        let response = app
            .clone()
            .oneshot(form_post("/templates/space/2/delete", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            backend.deleted.lock().unwrap()[0],
            (TemplateKind::SpaceTemplate, 2)
        );

        let response = app.oneshot(get("/templates/widgets/new")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

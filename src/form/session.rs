use tracing::debug;

use crate::errors::FormError;
use crate::fields::{CustomFieldValue, FieldSet, RenderContext, Submission, Template};

const TRACING_TARGET: &str = "backoffice::form";

/// Templates available to the selector of one form instance.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChoices {
    Loaded(Vec<Template>),
    /// The fetch failed; the selector shows a placeholder and nothing else.
    Failed,
}

impl TemplateChoices {
    pub fn templates(&self) -> &[Template] {
        match self {
            Self::Loaded(templates) => templates,
            Self::Failed => &[],
        }
    }

    pub fn find(&self, id: i64) -> Option<&Template> {
        self.templates().iter().find(|t| t.id == id)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl Default for TemplateChoices {
    fn default() -> Self {
        Self::Loaded(Vec::new())
    }
}

/// Observable state of a form instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Closed,
    /// Open with no template selected.
    Open,
    /// Open with a template's fields rendered.
    OpenWithFields,
    Submitting,
}

#[derive(Debug, Clone)]
enum Phase {
    Closed,
    Open {
        fields: Option<FieldSet>,
        error: Option<String>,
    },
    Submitting {
        fields: Option<FieldSet>,
    },
}

/// Proof that a submission was started, handed back with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    generation: u64,
    pub template_id: Option<i64>,
    pub custom_fields: Vec<CustomFieldValue>,
}

/// What happened to a submission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Success: the form closed.
    Closed,
    /// Failure: the form is open again with the error and its values.
    Reopened,
    /// The form was closed or reopened since; the outcome was dropped.
    Discarded,
}

/// Local state of one form instance.
///
/// `Closed → Open → Open(fields) → Submitting → Closed | Open(error)`.
/// Selecting a template re-renders its fields from scratch (re-applying the
/// record's stored values in edit mode). Only one submission may be in
/// flight, and outcomes are matched to the open generation that started them.
#[derive(Debug, Clone)]
pub struct FormSession {
    templates: TemplateChoices,
    ctx: RenderContext,
    stored: Vec<CustomFieldValue>,
    phase: Phase,
    generation: u64,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            templates: TemplateChoices::default(),
            ctx: RenderContext::default(),
            stored: Vec::new(),
            phase: Phase::Closed,
            generation: 0,
        }
    }

    /// Open for a new record.
    pub fn open(&mut self, templates: TemplateChoices, ctx: RenderContext) {
        self.open_for_edit(templates, ctx, Vec::new());
    }

    /// Open for an existing record whose custom fields are `stored`.
    pub fn open_for_edit(
        &mut self,
        templates: TemplateChoices,
        ctx: RenderContext,
        stored: Vec<CustomFieldValue>,
    ) {
        self.generation += 1;
        self.templates = templates;
        self.ctx = ctx;
        self.stored = stored;
        self.phase = Phase::Open {
            fields: None,
            error: None,
        };
        debug!(target: TRACING_TARGET, generation = self.generation, "form opened");
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.phase = Phase::Closed;
        self.stored.clear();
        debug!(target: TRACING_TARGET, generation = self.generation, "form closed");
    }

    pub fn status(&self) -> FormStatus {
        match &self.phase {
            Phase::Closed => FormStatus::Closed,
            Phase::Open { fields: None, .. } => FormStatus::Open,
            Phase::Open { fields: Some(_), .. } => FormStatus::OpenWithFields,
            Phase::Submitting { .. } => FormStatus::Submitting,
        }
    }

    pub fn templates(&self) -> &TemplateChoices {
        &self.templates
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Open { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&FieldSet> {
        match &self.phase {
            Phase::Open { fields, .. } | Phase::Submitting { fields } => fields.as_ref(),
            Phase::Closed => None,
        }
    }

    /// Editable fields; only while open.
    pub fn fields_mut(&mut self) -> Option<&mut FieldSet> {
        match &mut self.phase {
            Phase::Open { fields, .. } => fields.as_mut(),
            _ => None,
        }
    }

    pub fn selected_template(&self) -> Option<i64> {
        self.fields().map(|f| f.template().id)
    }

    /// Select a template (or none), discarding all current field state.
    pub fn select_template(&mut self, id: Option<i64>) -> Result<(), FormError> {
        let fields = match &self.phase {
            Phase::Open { .. } => match id {
                None => None,
                Some(id) => {
                    let template = self
                        .templates
                        .find(id)
                        .ok_or(FormError::UnknownTemplate { id })?;
                    let mut set = FieldSet::render(template, &self.ctx);
                    set.prefill(&self.stored);
                    Some(set)
                }
            },
            Phase::Submitting { .. } => return Err(FormError::SubmissionInFlight),
            Phase::Closed => return Err(FormError::NotOpen),
        };
        debug!(
            target: TRACING_TARGET,
            template_id = ?id,
            field_count = fields.as_ref().map_or(0, |f| f.inputs().len()),
            "template selected"
        );
        self.phase = Phase::Open {
            fields,
            error: None,
        };
        Ok(())
    }

    /// Take over posted control values for the rendered fields.
    pub fn apply(&mut self, submission: &Submission) -> Result<(), FormError> {
        match &mut self.phase {
            Phase::Open { fields, .. } => {
                if let Some(fields) = fields {
                    fields.apply(submission);
                }
                Ok(())
            }
            Phase::Submitting { .. } => Err(FormError::SubmissionInFlight),
            Phase::Closed => Err(FormError::NotOpen),
        }
    }

    /// Move to `Submitting`, extracting the custom fields to send.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, FormError> {
        let fields = match &mut self.phase {
            Phase::Open { fields, .. } => fields.take(),
            Phase::Submitting { .. } => return Err(FormError::SubmissionInFlight),
            Phase::Closed => return Err(FormError::NotOpen),
        };
        let ticket = SubmitTicket {
            generation: self.generation,
            template_id: fields.as_ref().map(|f| f.template().id),
            custom_fields: fields.as_ref().map(FieldSet::extract).unwrap_or_default(),
        };
        self.phase = Phase::Submitting { fields };
        debug!(
            target: TRACING_TARGET,
            generation = self.generation,
            custom_fields = ticket.custom_fields.len(),
            "submission started"
        );
        Ok(ticket)
    }

    /// Record the outcome of the submission identified by `ticket`.
    pub fn finish(&mut self, ticket: &SubmitTicket, result: Result<(), String>) -> Outcome {
        if ticket.generation != self.generation {
            debug!(target: TRACING_TARGET, generation = ticket.generation, "stale outcome discarded");
            return Outcome::Discarded;
        }
        let fields = match &mut self.phase {
            Phase::Submitting { fields } => fields.take(),
            _ => return Outcome::Discarded,
        };
        match result {
            Ok(()) => {
                self.close();
                Outcome::Closed
            }
            Err(message) => {
                self.phase = Phase::Open {
                    fields,
                    error: Some(message),
                };
                Outcome::Reopened
            }
        }
    }

    /// Show an error without submitting, as when a required selection is
    /// missing. The form stays open with its values.
    pub fn show_error(&mut self, message: impl Into<String>) -> Result<(), FormError> {
        match &mut self.phase {
            Phase::Open { error, .. } => {
                *error = Some(message.into());
                Ok(())
            }
            Phase::Submitting { .. } => Err(FormError::SubmissionInFlight),
            Phase::Closed => Err(FormError::NotOpen),
        }
    }
}

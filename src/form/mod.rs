//! Per-form-instance state: template selection, field state, submission.
//!
//! Each page load builds its own `FormSession`; nothing is shared between
//! form instances.

pub mod session;

pub use session::{FormSession, FormStatus, Outcome, SubmitTicket, TemplateChoices};

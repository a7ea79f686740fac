//! Back-office console: server-rendered record forms over the REST API.
//!
//! ```text
//! Browser ──GET/POST──> routes.rs ──FormSession──> fields::FieldSet
//!                          │                             │
//!                          │ Backend (client)      html::render_fields
//!                          v                             v
//!                      REST API                   pages.rs ──> HTML
//! ```
//!
//! | Module    | Responsibility                                              |
//! |-----------|-------------------------------------------------------------|
//! | `server`  | `ServerConfig`, router assembly, embedded assets, shutdown  |
//! | `routes`  | Handlers, `AppState`, error-page middleware                 |
//! | `records` | Activity/space core fields and the space fallbacks          |
//! | `pages`   | Handlebars pages: record forms, editor, error page          |
//!
//! Each request builds its own `FormSession`; nothing is shared between form
//! instances besides the backend handle.

pub mod pages;
pub mod records;
pub mod routes;
pub mod server;

pub use routes::{AppState, SharedState};
pub use server::{ServerConfig, build_router, start_server};

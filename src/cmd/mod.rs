//! CLI command implementations.
//!
//! | Module      | Commands handled |
//! |-------------|------------------|
//! | `serve`     | `Serve`          |
//! | `templates` | `Templates`      |
//! | `render`    | `Render`         |
//! | `config`    | `Config`         |

pub mod config;
pub mod render;
pub mod serve;
pub mod templates;

pub use config::cmd_config;
pub use render::cmd_render;
pub use serve::cmd_serve;
pub use templates::cmd_templates;

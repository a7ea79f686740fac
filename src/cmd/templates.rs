//! Template listing command: `backoffice templates <activity|space>`.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use backoffice::client::{ApiClient, Backend};
use backoffice::config::ConsoleToml;
use backoffice::fields::{Template, TemplateKind};
use console::style;

pub async fn cmd_templates(config_path: Option<&Path>, kind: &str) -> Result<()> {
    let kind: TemplateKind = kind.parse().map_err(|e: String| anyhow!(e))?;
    let (config, _) = ConsoleToml::discover(config_path)?;
    let client = ApiClient::new(config.request_context()?)?;

    let templates = client
        .list_templates(kind)
        .await
        .with_context(|| format!("Failed to list {} templates", kind.as_str()))?;

    if templates.is_empty() {
        println!("No templates in {}", kind.collection_path());
        return Ok(());
    }
    for template in &templates {
        print_template(template);
    }
    Ok(())
}

fn print_template(template: &Template) {
    println!(
        "{} {}",
        style(format!("#{}", template.id)).dim(),
        style(&template.name).bold()
    );
    if let Some(description) = template.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  {}", description);
    }
    if template.fields.is_empty() {
        println!("  (no fields)");
    }
    for field in &template.fields {
        if field.options.is_empty() {
            println!("  - {} ({})", field.name, style(&field.field_type).cyan());
        } else {
            println!(
                "  - {} ({}) [{}]",
                field.name,
                style(&field.field_type).cyan(),
                field.options.join(", ")
            );
        }
    }
    println!();
}

//! Offline field rendering command: `backoffice render`.

use std::path::Path;

use anyhow::{Context, Result};
use backoffice::fields::html::{registry, render_fields};
use backoffice::fields::{CustomFieldValue, FieldSet, RenderContext, Template};

pub fn cmd_render(template_path: &Path, values_path: Option<&Path>) -> Result<()> {
    let template: Template = read_json(template_path)?;
    let mut set = FieldSet::render(&template, &RenderContext::default());

    if let Some(path) = values_path {
        let stored: Vec<CustomFieldValue> = read_json(path)?;
        set.prefill(&stored);
    }

    let hb = registry().context("Failed to register field template")?;
    println!("{}", render_fields(&hb, &set)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

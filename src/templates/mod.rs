//! Template engine
//!
//! Tera templates compiled into the binary, optionally overridden file by
//! file from a directory on disk. Rendering never has to fail for the caller:
//! `render_with_fallback` degrades to `error.html` and then to a built-in page.

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::TemplateError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
    /// Directory whose templates replace the embedded ones
    override_path: Option<PathBuf>,
}

impl TemplateEngine {
    /// Create an engine from the embedded templates plus any overrides
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            override_path: override_path.map(Path::to_path_buf),
        };
        engine.load_templates()?;
        Ok(engine)
    }

    /// Engine with only the embedded templates
    pub fn embedded() -> Result<Self> {
        Self::new(None)
    }

    /// Re-read templates, picking up changes in the override directory
    pub fn reload(&mut self) -> Result<()> {
        self.load_templates()
    }

    fn load_templates(&mut self) -> Result<()> {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8(file.data.into_owned())
                    .with_context(|| format!("Embedded template is not UTF-8: {}", name))?;
                templates.insert(name.to_string(), content);
            }
        }

        if let Some(dir) = &self.override_path {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            for (name, content) in overrides {
                tracing::debug!("Template {} overridden from {:?}", name, dir);
                templates.insert(name, content);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())
            .map_err(|e| TemplateError::Render(error_chain("Failed to load templates", &e)))?;

        self.tera = tera;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        if !self.has_template(template) {
            return Err(TemplateError::NotFound(template.to_string()).into());
        }
        self.tera.render(template, context).map_err(|e| {
            TemplateError::Render(error_chain(&format!("Failed to render '{}'", template), &e))
                .into()
        })
    }

    /// Render a template, falling back to `error.html` and then to a
    /// built-in page.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    "Failed to render template '{}': {}, trying error template",
                    template,
                    e
                );

                let mut error_context = context.clone();
                error_context.insert("error_message", &e.to_string());
                error_context.insert("requested_template", template);

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {}, returning simple HTML error page",
                            error_template_err
                        );
                        simple_error_page("Template Error", &e.to_string())
                    }
                }
            }
        }
    }
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path).map_err(TemplateError::from)? {
        let path = entry.map_err(TemplateError::from)?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| TemplateError::Render("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }

    Ok(())
}

fn error_chain(prefix: &str, e: &tera::Error) -> String {
    let mut message = format!("{}: {}", prefix, e);
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Minimal standalone HTML page, used when no template can be rendered
pub fn simple_error_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        .error-box {{ border-left: 4px solid #c0392b; padding: 20px; background: #fafafa; }}
        h1 {{ color: #c0392b; margin-top: 0; }}
        pre {{ white-space: pre-wrap; color: #555; }}
    </style>
</head>
<body>
    <div class="error-box">
        <h1>{title}</h1>
        <pre>{message}</pre>
        <p><a href="/rango/">Back to Rango</a></p>
    </div>
</body>
</html>"#,
        title = tera::escape_html(title),
        message = tera::escape_html(message),
    )
}

#[cfg(test)]
mod tests;

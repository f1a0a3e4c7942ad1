//! Tests for the template engine

use super::*;
use crate::forms::FormErrors;
use crate::models::{Category, Page};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn base_context() -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("user", &Value::Null);
    context
}

#[test]
fn test_embedded_templates_are_registered() {
    let engine = TemplateEngine::embedded().expect("Failed to load embedded templates");

    for name in [
        "base.html",
        "error.html",
        "rango/index.html",
        "rango/about.html",
        "rango/category.html",
        "rango/add_category.html",
        "rango/add_page.html",
        "rango/register.html",
        "rango/login.html",
        "rango/restricted.html",
    ] {
        assert!(engine.has_template(name), "missing template {}", name);
    }
}

#[test]
fn test_render_index() {
    let engine = TemplateEngine::embedded().unwrap();

    let mut context = base_context();
    context.insert("boldmessage", "Crunchy, creamy, cookie, candy, cupcake!");
    context.insert("categories", &vec![Category::new("Python", "python")]);
    context.insert("pages", &Vec::<Page>::new());
    context.insert("visits", &3);

    let html = engine.render("rango/index.html", &context).unwrap();
    assert!(html.contains("Crunchy, creamy, cookie, candy, cupcake!"));
    assert!(html.contains("/rango/category/python/"));
    assert!(html.contains("There are no pages present."));
    assert!(html.contains("Visits: 3"));
    assert!(html.contains("/rango/login/"));
}

#[test]
fn test_render_unknown_category() {
    let engine = TemplateEngine::embedded().unwrap();

    let mut context = base_context();
    context.insert("category", &Value::Null);
    context.insert("pages", &Value::Null);

    let html = engine.render("rango/category.html", &context).unwrap();
    assert!(html.contains("The specified category does not exist."));
}

#[test]
fn test_form_errors_are_rendered() {
    let engine = TemplateEngine::embedded().unwrap();
    let mut errors = FormErrors::new();
    errors.add("name", "Category with this Name already exists.");

    let mut context = base_context();
    context.insert("form", &crate::forms::CategoryForm::new("Python"));
    context.insert("errors", &errors);

    let html = engine.render("rango/add_category.html", &context).unwrap();
    assert!(html.contains("Category with this Name already exists."));
    assert!(html.contains(r#"value="Python""#));
}

#[test]
fn test_output_is_escaped() {
    let engine = TemplateEngine::embedded().unwrap();

    let mut context = base_context();
    context.insert("boldmessage", "<script>alert(1)</script>");
    context.insert("categories", &Vec::<Category>::new());
    context.insert("pages", &Vec::<Page>::new());
    context.insert("visits", &1);

    let html = engine.render("rango/index.html", &context).unwrap();
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_override_directory_replaces_embedded_template() {
    let temp_dir = TempDir::new().unwrap();
    let rango_dir = temp_dir.path().join("rango");
    fs::create_dir_all(&rango_dir).unwrap();
    fs::write(
        rango_dir.join("about.html"),
        r#"{% extends "base.html" %}{% block body_block %}Custom about {{ visits }}{% endblock %}"#,
    )
    .unwrap();

    let engine = TemplateEngine::new(Some(temp_dir.path())).unwrap();

    let mut context = base_context();
    context.insert("visits", &7);
    let html = engine.render("rango/about.html", &context).unwrap();
    assert!(html.contains("Custom about 7"));
    // Untouched templates still come from the binary.
    assert!(engine.has_template("rango/index.html"));
}

#[test]
fn test_reload_picks_up_new_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = TemplateEngine::new(Some(temp_dir.path())).unwrap();
    assert!(!engine.has_template("extra.html"));

    fs::write(temp_dir.path().join("extra.html"), "extra").unwrap();
    engine.reload().unwrap();
    assert!(engine.has_template("extra.html"));
}

#[test]
fn test_broken_override_fails_to_load() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("broken.html"), "{% if %}").unwrap();

    assert!(TemplateEngine::new(Some(temp_dir.path())).is_err());
}

#[test]
fn test_render_missing_template_is_not_found() {
    let engine = TemplateEngine::embedded().unwrap();
    let err = engine.render("nope.html", &base_context()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TemplateError>(),
        Some(TemplateError::NotFound(_))
    ));
}

#[test]
fn test_render_with_fallback_uses_error_template() {
    let engine = TemplateEngine::embedded().unwrap();

    let html = engine.render_with_fallback("nope.html", &base_context());
    assert!(html.contains("Template not found: nope.html"));
    assert!(html.contains("/static/rango.css"));
}

#[test]
fn test_render_with_fallback_survives_broken_error_template() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("error.html"), "{{ missing.field }}").unwrap();
    let engine = TemplateEngine::new(Some(temp_dir.path())).unwrap();

    let html = engine.render_with_fallback("nope.html", &base_context());
    assert!(html.contains("<h1>Template Error</h1>"));
    assert!(html.contains("nope.html"));
}

#[test]
fn test_simple_error_page_escapes() {
    let html = simple_error_page("Oops", "<b>bad</b>");
    assert!(html.contains("&lt;b&gt;bad&lt;&#x2F;b&gt;"));
}

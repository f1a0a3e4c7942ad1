//! Form validation
//!
//! Each form deserializes straight from the submitted body and validates into
//! a [`FormErrors`] map keyed by field name. Templates render the messages
//! next to the matching inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";

const NAME_MAX_LEN: usize = 128;
const URL_MAX_LEN: usize = 200;
const USERNAME_MAX_LEN: usize = 150;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+-]+$").expect("USERNAME_RE: invalid regex pattern")
});
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://[^\s/?#@]+(?:[/?#]\S*)?$")
        .expect("URL_RE: invalid regex pattern")
});

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Append every message from `other`
    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was reported
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Required text field with an upper length bound
fn check_required(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    check_max_length(errors, field, value, max);
}

fn check_max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(field, max_length_message(max, len));
    }
}

/// Prefix `http://` unless the value already carries an http(s) scheme
pub fn ensure_http_scheme(url: &str) -> String {
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// Scheme followed by a non-empty host
pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Add-category form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

impl CategoryForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Trim the input and check field constraints
    pub fn validate(&mut self) -> Result<(), FormErrors> {
        self.name = self.name.trim().to_string();

        let mut errors = FormErrors::new();
        check_required(&mut errors, "name", &self.name, NAME_MAX_LEN);
        errors.into_result()
    }
}

/// Add-page form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl PageForm {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Normalize the url before validation
    pub fn clean(&mut self) {
        self.title = self.title.trim().to_string();
        self.url = ensure_http_scheme(self.url.trim());
    }

    pub fn validate(&mut self) -> Result<(), FormErrors> {
        self.clean();

        let mut errors = FormErrors::new();
        check_required(&mut errors, "title", &self.title, NAME_MAX_LEN);
        check_required(&mut errors, "url", &self.url, URL_MAX_LEN);
        if !errors.has("url") && !is_valid_url(&self.url) {
            errors.add("url", "Enter a valid URL.");
        }
        errors.into_result()
    }
}

/// Registration form for the account itself
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl UserForm {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Email as stored: `None` when left blank
    pub fn email(&self) -> Option<String> {
        if self.email.is_empty() {
            None
        } else {
            Some(self.email.clone())
        }
    }

    pub fn validate(&mut self) -> Result<(), FormErrors> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();

        let mut errors = FormErrors::new();
        check_required(&mut errors, "username", &self.username, USERNAME_MAX_LEN);
        if !errors.has("username") && !USERNAME_RE.is_match(&self.username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, \
                 and @/./+/-/_ characters.",
            );
        }

        if !self.email.is_empty() && !is_valid_email(&self.email) {
            errors.add("email", "Enter a valid email address.");
        }

        // Passwords keep their whitespace.
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result()
    }
}

/// Registration form for the profile
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserProfileForm {
    #[serde(default)]
    pub website: String,
}

impl UserProfileForm {
    pub fn new(website: impl Into<String>) -> Self {
        Self {
            website: website.into(),
        }
    }

    pub fn website(&self) -> Option<String> {
        if self.website.is_empty() {
            None
        } else {
            Some(self.website.clone())
        }
    }

    pub fn validate(&mut self) -> Result<(), FormErrors> {
        self.website = ensure_http_scheme(self.website.trim());

        let mut errors = FormErrors::new();
        if !self.website.is_empty() {
            check_max_length(&mut errors, "website", &self.website, URL_MAX_LEN);
            if !errors.has("website") && !is_valid_url(&self.website) {
                errors.add("website", "Enter a valid URL.");
            }
        }
        errors.into_result()
    }
}

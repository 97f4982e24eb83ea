//! Secret substitution into HTTP parameters.
//!
//! The parameters blob is parsed as JSON first; every string inside it is
//! then rendered as a minijinja template with the secrets table exposed as
//! `secrets`:
//!
//! ```text
//! {"request": {"method": "GET", "url": "https://api.example.com",
//!   "headers": {"Authorization": "Bearer {{ secrets.api_token }}"}}}
//! ```
//!
//! Substituted values never pass through the JSON parser, so quotes and
//! backslashes in a secret are kept as-is and cannot change the document.

use minijinja::{context, Environment, UndefinedBehavior};
use pancake_core::Secrets;
use serde_json::Value;

use crate::error::QueryError;

/// Render `{{ secrets.* }}` references in every string value of `params`.
///
/// Object keys are left alone. Referencing a secret that does not exist is
/// an error rather than an empty string.
pub(crate) fn render_secrets(params: Value, secrets: &Secrets) -> Result<Value, QueryError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    render_value(&env, params, secrets)
}

fn render_value(env: &Environment<'_>, value: Value, secrets: &Secrets) -> Result<Value, QueryError> {
    match value {
        Value::String(s) => render_str(env, s, secrets).map(Value::String),
        Value::Array(items) => items
            .into_iter()
            .map(|item| render_value(env, item, secrets))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| render_value(env, v, secrets).map(|v| (k, v)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

fn render_str(env: &Environment<'_>, raw: String, secrets: &Secrets) -> Result<String, QueryError> {
    if !raw.contains("{{") && !raw.contains("{%") {
        return Ok(raw);
    }
    env.render_str(&raw, context! { secrets => secrets })
        .map_err(|e| QueryError::InvalidQuery(format!("secret substitution failed: {e}")))
}

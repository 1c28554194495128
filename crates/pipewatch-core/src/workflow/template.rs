//! `${name}` template resolution for step inputs and conditions.
//!
//! Resolution rules:
//! - Non-string values pass through unchanged (objects and arrays are not
//!   walked).
//! - A string without any `${...}` token is returned unchanged.
//! - Each `${name}` is looked up in the step outputs, then in the execution
//!   context. A bound value is substituted in its compact JSON form (strings
//!   keep their quotes). Unbound tokens stay in the text verbatim.
//! - The substituted text is then parsed as JSON. On success the parsed value
//!   is returned, otherwise the text itself.
//!
//! So `"${build}"` with `build = {"id": 7}` yields the object back, while
//! `"Build ${id} broke"` with `id = "abc"` yields the string `Build "abc" broke`.

use pipewatch_types::execution::ValueMap;
use serde_json::Value;
use thiserror::Error;

const OPEN: &str = "${";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot serialize binding '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The two-level lookup a template resolves against.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    outputs: &'a ValueMap,
    context: Option<&'a ValueMap>,
}

impl<'a> Bindings<'a> {
    /// Outputs first, then context.
    pub fn new(outputs: &'a ValueMap, context: &'a ValueMap) -> Self {
        Self {
            outputs,
            context: Some(context),
        }
    }

    /// Outputs only.
    pub fn outputs_only(outputs: &'a ValueMap) -> Self {
        Self {
            outputs,
            context: None,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.outputs
            .get(name)
            .or_else(|| self.context.and_then(|c| c.get(name)))
    }
}

/// Resolve a step input or condition value.
pub fn resolve(value: &Value, bindings: &Bindings<'_>) -> Result<Value, TemplateError> {
    match value {
        Value::String(template) => resolve_str(template, bindings),
        other => Ok(other.clone()),
    }
}

/// Resolve a template string.
pub fn resolve_str(template: &str, bindings: &Bindings<'_>) -> Result<Value, TemplateError> {
    if !has_tokens(template) {
        return Ok(Value::String(template.to_string()));
    }

    let substituted = substitute(template, bindings)?;
    match serde_json::from_str::<Value>(&substituted) {
        Ok(parsed) => Ok(parsed),
        Err(_) => Ok(Value::String(substituted)),
    }
}

/// Whether `template` holds at least one `${name}` token with a non-empty name.
pub fn has_tokens(template: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        match after.find('}') {
            Some(0) => rest = &rest[start + 1..],
            Some(_) => return true,
            None => return false,
        }
    }
    false
}

/// Replace every bound token, leaving unbound ones verbatim.
fn substitute(template: &str, bindings: &Bindings<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find('}') else {
            break;
        };

        if end == 0 {
            // `${}` is not a token; emit the `$` and rescan from the brace.
            out.push_str(&rest[..=start]);
            rest = &rest[start + 1..];
            continue;
        }

        let name = &after[..end];
        out.push_str(&rest[..start]);
        match bindings.lookup(name) {
            Some(value) => {
                let text = serde_json::to_string(value).map_err(|source| {
                    TemplateError::Serialize {
                        name: name.to_string(),
                        source,
                    }
                })?;
                out.push_str(&text);
            }
            None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ValueMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn structured_output_round_trips() {
        let outputs = map(json!({"foo": {"a": 1}}));
        let ctx = ValueMap::new();
        let out = resolve_str("${foo}", &Bindings::new(&outputs, &ctx)).unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn string_binding_round_trips_to_plain_string() {
        let outputs = map(json!({"o1": "hello"}));
        let ctx = ValueMap::new();
        let out = resolve_str("${o1}", &Bindings::new(&outputs, &ctx)).unwrap();
        assert_eq!(out, json!("hello"));
    }

    #[test]
    fn outputs_shadow_context() {
        let outputs = map(json!({"id": 1}));
        let ctx = map(json!({"id": 2, "branch": "main"}));
        let bindings = Bindings::new(&outputs, &ctx);
        assert_eq!(resolve_str("${id}", &bindings).unwrap(), json!(1));
        assert_eq!(resolve_str("${branch}", &bindings).unwrap(), json!("main"));
    }

    #[test]
    fn embedded_string_keeps_json_quotes() {
        let outputs = ValueMap::new();
        let ctx = map(json!({"id": "abc"}));
        let out = resolve_str("Build ${id} broke", &Bindings::new(&outputs, &ctx)).unwrap();
        assert_eq!(out, json!("Build \"abc\" broke"));
    }

    #[test]
    fn substituted_text_reparses_into_structure() {
        let outputs = map(json!({"n": 3, "tag": "v1"}));
        let ctx = ValueMap::new();
        let out = resolve_str(r#"{"count": ${n}, "tag": ${tag}}"#, &Bindings::new(&outputs, &ctx))
            .unwrap();
        assert_eq!(out, json!({"count": 3, "tag": "v1"}));
    }

    #[test]
    fn unbound_tokens_stay_literal() {
        let outputs = map(json!({"a": 1}));
        let ctx = ValueMap::new();
        let out = resolve_str("${a} and ${missing}", &Bindings::new(&outputs, &ctx)).unwrap();
        assert_eq!(out, json!("1 and ${missing}"));
    }

    #[test]
    fn token_free_string_is_unchanged_even_if_json() {
        let outputs = ValueMap::new();
        let ctx = ValueMap::new();
        let bindings = Bindings::new(&outputs, &ctx);
        assert_eq!(resolve_str("42", &bindings).unwrap(), json!("42"));
        assert_eq!(resolve_str("hello", &bindings).unwrap(), json!("hello"));
    }

    #[test]
    fn non_string_values_pass_through() {
        let outputs = map(json!({"x": 1}));
        let ctx = ValueMap::new();
        let bindings = Bindings::new(&outputs, &ctx);
        let input = json!({"recipient": "oncall", "message": "${x}"});
        assert_eq!(resolve(&input, &bindings).unwrap(), input);
        assert_eq!(resolve(&json!(7), &bindings).unwrap(), json!(7));
        assert_eq!(resolve(&Value::Null, &bindings).unwrap(), Value::Null);
    }

    #[test]
    fn outputs_only_ignores_context() {
        let outputs = ValueMap::new();
        let out = resolve_str("${flag}", &Bindings::outputs_only(&outputs)).unwrap();
        assert_eq!(out, json!("${flag}"));
    }

    #[test]
    fn empty_and_unterminated_tokens() {
        let outputs = map(json!({"a": true}));
        let ctx = ValueMap::new();
        let bindings = Bindings::new(&outputs, &ctx);
        assert!(!has_tokens("${}"));
        assert!(!has_tokens("${a"));
        assert!(has_tokens("${}${a}"));
        assert_eq!(resolve_str("${}${a}", &bindings).unwrap(), json!("${}true"));
        assert_eq!(resolve_str("x ${a", &bindings).unwrap(), json!("x ${a"));
    }

    #[test]
    fn null_binding_substitutes_null() {
        let outputs = map(json!({"gone": null}));
        let ctx = ValueMap::new();
        let out = resolve_str("${gone}", &Bindings::new(&outputs, &ctx)).unwrap();
        assert_eq!(out, Value::Null);
    }
}

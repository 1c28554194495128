//! Step condition evaluation.
//!
//! A condition is a template string resolved with the same rules as step
//! inputs. The step runs iff the resolved value is truthy and is not the
//! exact string `"false"`. Falsy values are `false`, `null`, zero and the
//! empty string; arrays and objects are truthy even when empty. Any
//! resolution error skips the step.

use pipewatch_types::config::ConditionScope;
use pipewatch_types::execution::ValueMap;
use serde_json::Value;

use super::template::{self, Bindings};

/// Decides whether a step should run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator {
    scope: ConditionScope,
}

impl ConditionEvaluator {
    pub fn new(scope: ConditionScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> ConditionScope {
        self.scope
    }

    /// Evaluate `condition` against the current outputs and context.
    pub fn evaluate(&self, condition: &str, outputs: &ValueMap, context: &ValueMap) -> bool {
        let bindings = match self.scope {
            ConditionScope::Outputs => Bindings::outputs_only(outputs),
            ConditionScope::OutputsAndContext => Bindings::new(outputs, context),
        };

        match template::resolve_str(condition, &bindings) {
            Ok(value) => passes(&value),
            Err(e) => {
                tracing::warn!(condition, error = %e, "condition resolution failed, skipping step");
                false
            }
        }
    }
}

/// Truthy and not the literal string `"false"`.
pub fn passes(value: &Value) -> bool {
    is_truthy(value) && value.as_str() != Some("false")
}

/// JavaScript-style truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
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
    fn truthiness_table() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("no")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn literal_false_string_does_not_pass() {
        assert!(!passes(&json!("false")));
        assert!(passes(&json!("False")));
        assert!(passes(&json!("no")));
    }

    #[test]
    fn false_context_flag_skips() {
        let eval = ConditionEvaluator::default();
        let ctx = map(json!({"flag": false}));
        assert!(!eval.evaluate("${flag}", &ValueMap::new(), &ctx));
    }

    #[test]
    fn string_false_output_skips() {
        let eval = ConditionEvaluator::default();
        let outputs = map(json!({"decision": "false"}));
        assert!(!eval.evaluate("${decision}", &outputs, &ValueMap::new()));
    }

    #[test]
    fn truthy_output_runs() {
        let eval = ConditionEvaluator::default();
        let outputs = map(json!({"build": {"status": "failed"}}));
        assert!(eval.evaluate("${build}", &outputs, &ValueMap::new()));
    }

    #[test]
    fn zero_and_null_outputs_skip() {
        let eval = ConditionEvaluator::default();
        let outputs = map(json!({"count": 0, "owner": null}));
        assert!(!eval.evaluate("${count}", &outputs, &ValueMap::new()));
        assert!(!eval.evaluate("${owner}", &outputs, &ValueMap::new()));
    }

    #[test]
    fn unresolved_token_is_truthy_text() {
        let eval = ConditionEvaluator::default();
        assert!(eval.evaluate("${missing}", &ValueMap::new(), &ValueMap::new()));
    }

    #[test]
    fn outputs_scope_does_not_see_context() {
        let eval = ConditionEvaluator::new(ConditionScope::Outputs);
        let ctx = map(json!({"flag": false}));
        // Unresolved, so the literal token text is truthy.
        assert!(eval.evaluate("${flag}", &ValueMap::new(), &ctx));

        let outputs = map(json!({"flag": false}));
        assert!(!eval.evaluate("${flag}", &outputs, &ctx));
        assert_eq!(eval.scope(), ConditionScope::Outputs);
    }

    #[test]
    fn literal_conditions_without_tokens() {
        let eval = ConditionEvaluator::default();
        assert!(!eval.evaluate("false", &ValueMap::new(), &ValueMap::new()));
        assert!(!eval.evaluate("", &ValueMap::new(), &ValueMap::new()));
        assert!(eval.evaluate("true", &ValueMap::new(), &ValueMap::new()));
    }
}

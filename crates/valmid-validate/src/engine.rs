//! The validation engine.

use crate::builtin::{is_zero, Builtin};
use crate::error::{RuleError, ValidationErrors, Violation};
use crate::rule::{is_valid_name, Rule, RuleSet, DIVE};
use crate::structure::StructRules;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A custom rule: receives the value and the rule parameter, returns true
/// when the value passes.
pub type RuleFn = Arc<dyn Fn(&Value, Option<&str>) -> bool + Send + Sync>;

/// Runs [`StructRules`] against JSON values.
///
/// Knows every built-in rule plus any custom rules registered with
/// [`register_rule`](Self::register_rule). Each value stops at its first
/// failing rule; failures in different fields and elements are all
/// collected.
///
/// # Example
///
/// ```rust
/// use valmid_validate::{StructRules, Validator};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let mut validator = Validator::new();
/// let even = |value: &serde_json::Value, _: Option<&str>| {
///     value.as_i64().is_some_and(|n| n % 2 == 0)
/// };
/// validator.register_rule("even", Arc::new(even)).unwrap();
///
/// let rules = StructRules::builder().field("count", "even").build().unwrap();
/// validator.check(&rules).unwrap();
///
/// assert!(validator.validate(&rules, &json!({ "count": 4 })).is_ok());
/// assert!(validator.validate(&rules, &json!({ "count": 3 })).is_err());
/// ```
#[derive(Clone, Default)]
pub struct Validator {
    custom: HashMap<String, RuleFn>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("Validator")
            .field("custom_rules", &names)
            .finish()
    }
}

impl Validator {
    /// Creates a validator with only the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom rule, replacing any custom rule with the same name.
    ///
    /// Built-in names and `dive` cannot be taken.
    pub fn register_rule(&mut self, name: &str, rule: RuleFn) -> Result<(), RuleError> {
        if !is_valid_name(name) {
            return Err(RuleError::InvalidName {
                name: name.to_string(),
            });
        }
        if name == DIVE || Builtin::from_name(name).is_some() {
            return Err(RuleError::ReservedName {
                name: name.to_string(),
            });
        }
        debug!(rule = %name, "registered custom rule");
        self.custom.insert(name.to_string(), rule);
        Ok(())
    }

    /// Returns true if `name` is a built-in or registered rule.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        Builtin::from_name(name).is_some() || self.custom.contains_key(name)
    }

    /// Checks that every rule is known and its parameter well-formed.
    pub fn check(&self, rules: &StructRules) -> Result<(), RuleError> {
        for field in rules.fields() {
            self.check_set(field.rules())
                .map_err(|e| e.in_field(field.name()))?;
            if let Some(nested) = field.nested() {
                self.check(nested).map_err(|e| e.in_field(field.name()))?;
            }
        }
        Ok(())
    }

    /// Checks a single rule set, element rules included.
    pub fn check_set(&self, set: &RuleSet) -> Result<(), RuleError> {
        for rule in set.rules() {
            if let Some(builtin) = Builtin::from_name(rule.name()) {
                builtin.check_param(rule.name(), rule.param())?;
            } else if !self.custom.contains_key(rule.name()) {
                return Err(RuleError::UnknownRule {
                    rule: rule.name().to_string(),
                });
            }
        }
        match set.elements() {
            Some(elements) => self.check_set(elements),
            None => Ok(()),
        }
    }

    /// Validates an object against `rules`, collecting every violation.
    ///
    /// Fields absent from `value` are validated as null.
    pub fn validate(&self, rules: &StructRules, value: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.validate_struct(rules, value, "", &mut errors);
        errors.into_result()
    }

    /// Validates one value against a rule set, reporting violations under `path`.
    pub fn validate_value(
        &self,
        set: &RuleSet,
        value: &Value,
        path: &str,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.walk(set, value, path, &mut errors);
        errors.into_result()
    }

    fn validate_struct(
        &self,
        rules: &StructRules,
        value: &Value,
        prefix: &str,
        errors: &mut ValidationErrors,
    ) {
        for field in rules.fields() {
            let path = if prefix.is_empty() {
                field.name().to_string()
            } else {
                format!("{prefix}.{}", field.name())
            };
            let field_value = value.get(field.name()).unwrap_or(&Value::Null);
            self.walk(field.rules(), field_value, &path, errors);
            if let (Some(nested), true) = (field.nested(), field_value.is_object()) {
                self.validate_struct(nested, field_value, &path, errors);
            }
        }
    }

    fn walk(&self, set: &RuleSet, value: &Value, path: &str, errors: &mut ValidationErrors) {
        for rule in set.rules() {
            if rule.name() == "omitempty" {
                if is_zero(value) {
                    return;
                }
                continue;
            }
            if !self.passes(rule, value, path) {
                errors.push(Violation::new(path, rule));
                return;
            }
        }
        if let (Some(elements), Value::Array(items)) = (set.elements(), value) {
            for (i, item) in items.iter().enumerate() {
                self.walk(elements, item, &format!("{path}[{i}]"), errors);
            }
        }
    }

    fn passes(&self, rule: &Rule, value: &Value, path: &str) -> bool {
        if let Some(builtin) = Builtin::from_name(rule.name()) {
            return builtin.eval(value, rule.param());
        }
        match self.custom.get(rule.name()) {
            Some(custom) => custom(value, rule.param()),
            None => {
                warn!(rule = %rule.name(), path = %path, "unknown validation rule");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(build: impl FnOnce(crate::StructRulesBuilder) -> crate::StructRulesBuilder) -> StructRules {
        build(StructRules::builder()).build().unwrap()
    }

    fn paths(errors: &ValidationErrors) -> Vec<String> {
        errors
            .violations()
            .iter()
            .map(|v| format!("{}:{}", v.path(), v.rule()))
            .collect()
    }

    #[test]
    fn test_first_failure_per_field_all_fields_reported() {
        let rules = rules(|b| b.field("name", "required,min=3,alpha").field("age", "gte=18"));
        let errors = Validator::new()
            .validate(&rules, &json!({ "name": "", "age": 12 }))
            .unwrap_err();

        assert_eq!(paths(&errors), vec!["name:required", "age:gte"]);
    }

    #[test]
    fn test_nested_paths() {
        let rules = rules(|b| b.nested("body", "required", |b| b.field("name", "required,min=3")));
        let validator = Validator::new();

        let errors = validator
            .validate(&rules, &json!({ "body": { "name": "Jo" } }))
            .unwrap_err();
        assert_eq!(paths(&errors), vec!["body.name:min"]);

        let errors = validator.validate(&rules, &json!({ "body": null })).unwrap_err();
        assert_eq!(paths(&errors), vec!["body:required"]);

        assert!(validator
            .validate(&rules, &json!({ "body": { "name": "John" } }))
            .is_ok());
    }

    #[test]
    fn test_dive_reports_each_element() {
        let rules = rules(|b| b.field("tags", "min=1,dive,required,max=3"));
        let validator = Validator::new();

        let errors = validator
            .validate(&rules, &json!({ "tags": ["a", "", "abcd", "b"] }))
            .unwrap_err();
        assert_eq!(paths(&errors), vec!["tags[1]:required", "tags[2]:max"]);

        let errors = validator.validate(&rules, &json!({ "tags": [] })).unwrap_err();
        assert_eq!(paths(&errors), vec!["tags:min"]);
    }

    #[test]
    fn test_omitempty_skips_zero_values() {
        let rules = rules(|b| b.field("email", "omitempty,email").field("page", "omitempty,gt=0"));
        let validator = Validator::new();

        assert!(validator.validate(&rules, &json!({ "email": "", "page": 0 })).is_ok());
        assert!(validator.validate(&rules, &json!({})).is_ok());

        let errors = validator
            .validate(&rules, &json!({ "email": "nope", "page": -1 }))
            .unwrap_err();
        assert_eq!(paths(&errors), vec!["email:email", "page:gt"]);
    }

    #[test]
    fn test_check_rejects_unknown_and_bad_params() {
        let validator = Validator::new();

        let err = validator.check(&rules(|b| b.field("id", "positive"))).unwrap_err();
        assert_eq!(err.to_string(), "field 'id': unknown rule 'positive'");

        let err = validator
            .check(&rules(|b| b.field("tags", "dive,max=many")))
            .unwrap_err();
        assert!(matches!(err, RuleError::Field { .. }));

        let err = validator
            .check(&rules(|b| b.nested("body", "", |b| b.field("name", "min"))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'body': field 'name': rule 'min' requires a parameter"
        );
    }

    #[test]
    fn test_custom_rules() {
        let mut validator = Validator::new();
        validator
            .register_rule("prefix", Arc::new(|v: &Value, p: Option<&str>| {
                v.as_str().is_some_and(|s| s.starts_with(p.unwrap_or("")))
            }))
            .unwrap();

        assert!(validator.knows("prefix"));
        assert!(matches!(
            validator.register_rule("required", Arc::new(|_: &Value, _: Option<&str>| true)),
            Err(RuleError::ReservedName { .. })
        ));
        assert!(matches!(
            validator.register_rule("dive", Arc::new(|_: &Value, _: Option<&str>| true)),
            Err(RuleError::ReservedName { .. })
        ));
        assert!(matches!(
            validator.register_rule("bad name", Arc::new(|_: &Value, _: Option<&str>| true)),
            Err(RuleError::InvalidName { .. })
        ));

        let rules = rules(|b| b.field("sku", "prefix=SKU-"));
        validator.check(&rules).unwrap();
        assert!(validator.validate(&rules, &json!({ "sku": "SKU-1" })).is_ok());
        let errors = validator.validate(&rules, &json!({ "sku": "X-1" })).unwrap_err();
        assert_eq!(errors.violations()[0].param(), Some("SKU-"));
    }

    #[test]
    fn test_unknown_rule_at_validation_time_is_a_violation() {
        let rules = rules(|b| b.field("id", "positive"));
        let errors = Validator::new().validate(&rules, &json!({ "id": 1 })).unwrap_err();

        assert_eq!(paths(&errors), vec!["id:positive"]);
    }

    #[test]
    fn test_validate_value() {
        let set: RuleSet = "required,dive,numeric".parse().unwrap();
        let errors = Validator::new()
            .validate_value(&set, &json!(["1", "x"]), "ids")
            .unwrap_err();

        assert_eq!(paths(&errors), vec!["ids[1]:numeric"]);
    }
}

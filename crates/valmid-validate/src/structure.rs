//! Rules for a structured value.

use crate::error::RuleError;
use crate::rule::RuleSet;

/// Rules for one named field, plus the rules of its fields when the value
/// is itself an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    name: String,
    rules: RuleSet,
    nested: Option<StructRules>,
}

impl FieldRules {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rules applied to the field value.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the rules for the fields of a nested object.
    #[must_use]
    pub fn nested(&self) -> Option<&StructRules> {
        self.nested.as_ref()
    }
}

/// Rules for every field of an object, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructRules {
    fields: Vec<FieldRules>,
}

impl StructRules {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> StructRulesBuilder {
        StructRulesBuilder::default()
    }

    /// Returns the field rules in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldRules] {
        &self.fields
    }

    /// Returns true if no field carries any rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields
            .iter()
            .all(|f| f.rules.is_empty() && f.nested.as_ref().map_or(true, StructRules::is_empty))
    }
}

/// Builder for [`StructRules`].
///
/// Parse errors are kept and reported by [`build`](Self::build), tagged
/// with the field they belong to.
#[derive(Debug, Default)]
pub struct StructRulesBuilder {
    fields: Vec<FieldRules>,
    error: Option<RuleError>,
}

impl StructRulesBuilder {
    /// Adds a field with the given rule declaration.
    pub fn field(self, name: impl Into<String>, rules: &str) -> Self {
        self.push(name.into(), rules, None)
    }

    /// Adds an object field whose own fields are described by `build`.
    pub fn nested(
        self,
        name: impl Into<String>,
        rules: &str,
        build: impl FnOnce(StructRulesBuilder) -> StructRulesBuilder,
    ) -> Self {
        let name = name.into();
        match build(StructRulesBuilder::default()).build() {
            Ok(nested) => self.push(name, rules, Some(nested)),
            Err(e) => self.fail(e.in_field(&name)),
        }
    }

    fn push(mut self, name: String, rules: &str, nested: Option<StructRules>) -> Self {
        match rules.parse::<RuleSet>() {
            Ok(rules) => {
                self.fields.push(FieldRules {
                    name,
                    rules,
                    nested,
                });
                self
            }
            Err(e) => self.fail(e.in_field(&name)),
        }
    }

    fn fail(mut self, error: RuleError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Finishes the builder, returning the first parse error if any.
    pub fn build(self) -> Result<StructRules, RuleError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(StructRules {
                fields: self.fields,
            }),
        }
    }
}

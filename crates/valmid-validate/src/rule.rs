//! Rule declarations.
//!
//! Rules are written as a comma-separated list, each entry either a bare name
//! or `name=param`:
//!
//! ```text
//! required,min=3                 present and at least three characters
//! oneof=admin user               one of a space-separated set
//! required,min=1,dive,required   non-empty list of non-empty elements
//! ```
//!
//! Everything after `dive` applies to each element of a sequence instead of
//! the sequence itself. Parsing only checks the syntax; whether a name is
//! known and its parameter well-formed is checked by the
//! [`Validator`](crate::Validator) that will run it.

use crate::error::RuleError;
use std::fmt;
use std::str::FromStr;

pub(crate) const DIVE: &str = "dive";

/// A single named rule with an optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    param: Option<String>,
}

impl Rule {
    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter, if one was given.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let (name, param) = match entry.split_once('=') {
            Some((name, param)) => (name.trim(), Some(param.trim().to_string())),
            None => (entry.trim(), None),
        };
        if !is_valid_name(name) {
            return Err(RuleError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            param,
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}={}", self.name, param),
            None => f.write_str(&self.name),
        }
    }
}

/// An ordered list of rules for one value, plus the rules for its elements.
///
/// # Example
///
/// ```rust
/// use valmid_validate::RuleSet;
///
/// let rules: RuleSet = "required,min=1,dive,required".parse().unwrap();
/// assert_eq!(rules.rules().len(), 2);
/// assert_eq!(rules.elements().unwrap().rules()[0].name(), "required");
/// assert_eq!(rules.to_string(), "required,min=1,dive,required");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    elements: Option<Box<RuleSet>>,
}

impl RuleSet {
    /// Returns the rules applied to the value itself.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the rules applied to each element, if `dive` was used.
    #[must_use]
    pub fn elements(&self) -> Option<&RuleSet> {
        self.elements.as_deref()
    }

    /// Returns true if there is nothing to check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.elements.is_none()
    }

    fn from_entries(entries: &[&str], declaration: &str) -> Result<Self, RuleError> {
        let mut set = Self::default();
        for (i, entry) in entries.iter().enumerate() {
            if entry.trim().is_empty() {
                return Err(RuleError::EmptyRule {
                    rules: declaration.to_string(),
                });
            }
            let rule: Rule = entry.parse()?;
            if rule.name == DIVE {
                if rule.param.is_some() {
                    return Err(RuleError::UnexpectedParam { rule: rule.name });
                }
                set.elements = Some(Box::new(Self::from_entries(&entries[i + 1..], declaration)?));
                break;
            }
            set.rules.push(rule);
        }
        Ok(set)
    }
}

impl FromStr for RuleSet {
    type Err = RuleError;

    fn from_str(declaration: &str) -> Result<Self, Self::Err> {
        if declaration.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: Vec<&str> = declaration.split(',').collect();
        Self::from_entries(&entries, declaration)
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<String> = self.rules.iter().map(ToString::to_string).collect();
        if let Some(elements) = &self.elements {
            entries.push(DIVE.to_string());
            let rest = elements.to_string();
            if !rest.is_empty() {
                entries.push(rest);
            }
        }
        f.write_str(&entries.join(","))
    }
}

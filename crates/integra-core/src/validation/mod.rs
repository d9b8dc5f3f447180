//! Declarative validation
//!
//! A validator runs an ordered set of checks against one record. Each check
//! resolves a `constraint` and a `to_validate` value through getters, falls
//! back to a configured default when a getter yields a falsy value, and hands
//! both to a comparator that may produce a violation.
//!
//! ```json
//! {
//!   "checks": {
//!     "capacity": {
//!       "constraint": {"func": "const", "params": {"value": 40}},
//!       "to_validate": {
//!         "func": "aggregate",
//!         "params": {
//!           "extract": {"db": "scrum", "match": ["group"], "collection": "backlog"},
//!           "aggregate": {"field": "hours", "func": "sum"}
//!         },
//!         "default": 0
//!       },
//!       "compare": {
//!         "func": "limit_exceed",
//!         "violation": {"severity": "warning", "message": "Capacity of {}h exceeded"}
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Copyright (c) 2025 Integra Team
//! Licensed under the Apache-2.0 license

pub mod comparators;
pub mod getters;

use crate::converter::convert;
use crate::params::Params;
use crate::store::Databases;
use crate::transformation::formatting;
use crate::types::{is_truthy, ordered, FieldType, Record, Severity, Violation};
use crate::Result;
use comparators::CompareFn;
use getters::GetterFn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Validation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorConfig {
    #[serde(deserialize_with = "ordered::deserialize")]
    pub checks: Vec<(String, CheckConfig)>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckConfig {
    pub constraint: GetterConfig,
    pub to_validate: GetterConfig,
    pub compare: CompareConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GetterConfig {
    pub func: String,
    #[serde(default)]
    pub params: Params,
    /// Used when the getter yields a falsy value; `{value, type}` is converted
    #[serde(default)]
    pub default: Option<Value>,
}

impl GetterConfig {
    fn default_value(&self) -> Result<Value> {
        match &self.default {
            None => Ok(Value::Null),
            Some(Value::Object(typed)) if typed.contains_key("value") && typed.contains_key("type") => {
                let target: FieldType = serde_json::from_value(typed["type"].clone()).map_err(|e| {
                    crate::Error::Configuration {
                        message: format!("Invalid default type for getter '{}': {}", self.func, e),
                        source: Some(e.into()),
                    }
                })?;
                convert(&typed["value"], target)
            }
            Some(raw) => Ok(raw.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompareConfig {
    pub func: String,
    pub violation: ViolationTemplate,
}

/// Severity plus a message where `{}` receives the constraint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViolationTemplate {
    pub severity: Severity,
    pub message: String,
}

impl ViolationTemplate {
    pub fn render(&self, constraint: &Value) -> Result<Violation> {
        Ok(Violation {
            severity: self.severity.clone(),
            message: formatting::format(&self.message, std::slice::from_ref(constraint))?,
        })
    }
}

struct Getter {
    func: GetterFn,
    config: GetterConfig,
}

impl Getter {
    fn resolve(&self, record: &Record, databases: &Databases) -> Result<Value> {
        let value = (self.func)(record, &self.config.params, databases)?;
        if is_truthy(&value) {
            Ok(value)
        } else {
            self.config.default_value()
        }
    }
}

/// One resolved check
pub struct Check {
    name: String,
    constraint: Getter,
    to_validate: Getter,
    compare: CompareFn,
    violation: ViolationTemplate,
}

impl Check {
    pub fn new(name: impl Into<String>, config: CheckConfig) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            constraint: Getter {
                func: getters::lookup(&config.constraint.func)?,
                config: config.constraint,
            },
            to_validate: Getter {
                func: getters::lookup(&config.to_validate.func)?,
                config: config.to_validate,
            },
            compare: comparators::lookup(&config.compare.func)?,
            violation: config.compare.violation,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validate(&self, record: &Record, databases: &Databases) -> Result<Option<Violation>> {
        let constraint = self.constraint.resolve(record, databases)?;
        let to_validate = self.to_validate.resolve(record, databases)?;
        debug!(check = %self.name, %constraint, %to_validate, "Comparing");
        (self.compare)(&to_validate, &constraint, &self.violation)
    }
}

/// Runs every configured check against a record
pub struct Validator<'a> {
    checks: Vec<Check>,
    databases: &'a Databases,
}

impl<'a> Validator<'a> {
    /// Resolve every getter and comparator; unknown names fail here
    pub fn new(config: ValidatorConfig, databases: &'a Databases) -> Result<Self> {
        let checks = config
            .checks
            .into_iter()
            .map(|(name, check)| Check::new(name, check))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { checks, databases })
    }

    /// Violations of all checks in configuration order, `None` when clean
    pub fn validate(&self, record: &Record) -> Result<Option<Vec<Violation>>> {
        let mut violations = Vec::new();
        for check in &self.checks {
            info!(check = check.name(), "Performing validation check");
            if let Some(violation) = check.validate(record, self.databases)? {
                violations.push(violation);
            }
        }
        Ok(if violations.is_empty() { None } else { Some(violations) })
    }
}

//! Validation engine tests with getters reading from a store


use integra_core::validation::comparators::{limit_exceed, no_intersection};
use integra_core::validation::{Validator, ValidatorConfig, ViolationTemplate};
use integra_core::Severity;
use proptest::prelude::*;
use serde_json::{json, Value};
use test_support::*;

fn template() -> ViolationTemplate {
    ViolationTemplate {
        severity: Severity::Warning,
        message: "Group capacity of {} hours exceeded".to_string(),
    }
}

#[test]
fn test_limit_exceed_boundary() {
    assert_eq!(limit_exceed(&json!(5), &json!(5), &template()).unwrap(), None);
    let violation = limit_exceed(&json!(6), &json!(5), &template()).unwrap().unwrap();
    assert!(violation.message.contains('5'));
    assert_eq!(violation.message, "Group capacity of 5 hours exceeded");
}

proptest! {
    #[test]
    fn prop_empty_constraint_never_violates(values in prop::collection::vec("[a-z]{1,6}", 0..6)) {
        let to_validate = Value::from(values);
        prop_assert_eq!(no_intersection(&to_validate, &json!([]), &template()).unwrap(), None);
    }
}

#[test]
fn test_capacity_check_with_substitution() {
    let databases = memory_databases(&["scrum"]);
    seed(
        &databases,
        "scrum",
        "backlog",
        json!([
            {"key": "A-1", "group": "dev", "hours": 16},
            {"key": "A-2", "group": "dev", "hours": 20},
            {"key": "A-3", "group": "qa", "hours": 30}
        ]),
    );
    seed(&databases, "scrum", "capacity", json!([{"group": "dev", "hours": 40}, {"group": "qa", "hours": 24}]));

    let config: ValidatorConfig = serde_json::from_value(json!({
        "checks": {
            "group.capacity": {
                "constraint": {
                    "func": "validation.extract",
                    "params": {"db": "scrum", "match": ["group"], "collection": "capacity", "field": "hours"},
                    "default": 0
                },
                "to_validate": {
                    "func": "validation.aggregate",
                    "params": {
                        "extract": {"db": "scrum", "match": ["group"], "collection": "backlog"},
                        "substitute": {"match": ["key"], "field": "hours"},
                        "aggregate": {"field": "hours", "func": "sum"}
                    },
                    "default": 0
                },
                "compare": {
                    "func": "limit_exceed",
                    "violation": {"severity": "warning", "message": "Group capacity of {} hours exceeded"}
                }
            }
        }
    }))
    .unwrap();
    let validator = Validator::new(config, &databases).unwrap();

    let fits = json!({"key": "A-1", "group": "dev", "hours": 20});
    assert_eq!(validator.validate(fits.as_object().unwrap()).unwrap(), None);

    let too_much = json!({"key": "A-1", "group": "dev", "hours": 21});
    let violations = validator.validate(too_much.as_object().unwrap()).unwrap().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Warning);
    assert_eq!(violations[0].message, "Group capacity of 40 hours exceeded");

    let new_task = json!({"key": "A-9", "group": "dev", "hours": 5});
    assert!(validator.validate(new_task.as_object().unwrap()).unwrap().is_some());
}

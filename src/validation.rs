//! Local checks run before any network call.

use regex::Regex;
use serde_json::Value;

use crate::error::ReconcileError;
use crate::resource::{Attributes, DeclaredResource, is_set};
use crate::schema::{Check, FieldKind, FieldSpec, Presence, ResourceSpec, Rule};

/// Validate a declared resource against its kind, collecting every problem
/// into a single [`ReconcileError::Validation`].
pub fn validate(spec: &ResourceSpec, declared: &DeclaredResource) -> Result<(), ReconcileError> {
    let diagnostics = diagnose(spec, declared.attributes());
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::validation(spec.type_name, diagnostics.join("; ")))
    }
}

/// Every problem found in `attributes`, in schema order.
pub fn diagnose(spec: &ResourceSpec, attributes: &Attributes) -> Vec<String> {
    let mut diagnostics = Vec::new();

    for name in attributes.keys() {
        if spec.field(name).is_none() {
            diagnostics.push(format!("unsupported attribute '{}'", name));
        }
    }

    for field in &spec.fields {
        let value = attributes.get(field.name).filter(|v| is_set(v));
        match (field.presence, value) {
            (Presence::Computed, Some(_)) => {
                diagnostics.push(format!("'{}' is computed and cannot be set", field.name));
            }
            (Presence::Required, None) if field.default.is_none() => {
                diagnostics.push(format!("missing required attribute '{}'", field.name));
            }
            (_, Some(value)) => check_value(field, value, &mut diagnostics),
            _ => {}
        }
    }

    for rule in &spec.rules {
        if let Rule::AtLeastOneOf(group) = rule {
            let any_set = group
                .iter()
                .any(|name| attributes.get(*name).is_some_and(is_set));
            if !any_set {
                diagnostics.push(format!("one of {} must be set", group.join(", ")));
            }
        }
    }

    diagnostics
}

/// Fill in schema defaults for attributes left unset.
pub fn apply_defaults(spec: &ResourceSpec, declared: &DeclaredResource) -> DeclaredResource {
    let mut attributes = declared.attributes().clone();
    for field in &spec.fields {
        if let Some(default) = &field.default
            && !attributes.get(field.name).is_some_and(is_set)
        {
            attributes.insert(field.name.to_string(), default.clone());
        }
    }
    DeclaredResource::from_attributes(attributes)
}

/// Rules that compare the declared state with the prior one.
pub fn check_transition(
    spec: &ResourceSpec,
    prior: &Attributes,
    declared: &DeclaredResource,
) -> Result<(), ReconcileError> {
    for rule in &spec.rules {
        if let Rule::NonDecreasing(name) = rule {
            let old = prior.get(*name).and_then(as_int);
            let new = declared.get(name).and_then(as_int);
            if let (Some(old), Some(new)) = (old, new)
                && new < old
            {
                return Err(ReconcileError::validation(
                    spec.type_name,
                    format!(
                        "{} can only be adjusted to a greater value ({} -> {})",
                        name, old, new
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Integer view of a value; numeric strings are accepted.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_value(field: &FieldSpec, value: &Value, diagnostics: &mut Vec<String>) {
    if let Some(problem) = type_problem(field.kind, value) {
        diagnostics.push(format!("'{}': {}", field.name, problem));
        return;
    }

    for check in &field.checks {
        if let Some(problem) = check_problem(check, value) {
            diagnostics.push(format!("'{}': {}", field.name, problem));
        }
    }
}

fn type_problem(kind: FieldKind, value: &Value) -> Option<String> {
    let ok = match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Int => as_int(value).is_some(),
        FieldKind::Bool => value.is_boolean(),
        FieldKind::StringList | FieldKind::StringSet => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Tags => value
            .as_object()
            .is_some_and(|map| map.values().all(Value::is_string)),
        FieldKind::Json => {
            return match value {
                Value::String(text) => serde_json::from_str::<Value>(text)
                    .err()
                    .map(|e| format!("invalid JSON document: {}", e)),
                _ => Some(format!("expected {}", kind.name())),
            };
        }
    };
    (!ok).then(|| format!("expected {}", kind.name()))
}

fn check_problem(check: &Check, value: &Value) -> Option<String> {
    match check {
        Check::LenBetween(min, max) => {
            let len = value.as_str()?.chars().count();
            (len < *min || len > *max)
                .then(|| format!("length must be between {} and {}, got {}", min, max, len))
        }
        Check::IntBetween(min, max) => {
            let n = as_int(value)?;
            (n < *min || n > *max)
                .then(|| format!("must be between {} and {}, got {}", min, max, n))
        }
        Check::OneOf(allowed) => {
            let s = value.as_str()?;
            (!allowed.contains(&s))
                .then(|| format!("must be one of {}, got '{}'", allowed.join(", "), s))
        }
        Check::Pattern(pattern, message) => {
            let s = value.as_str()?;
            match Regex::new(pattern) {
                Ok(re) => (!re.is_match(s)).then(|| message.to_string()),
                Err(e) => Some(format!("invalid pattern {}: {}", pattern, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Product;
    use crate::schema::{Identity, ReadSpec};
    use serde_json::json;

    fn spec() -> ResourceSpec {
        ResourceSpec::new(
            "alibabacloudstack_arms_alert_contact",
            Product::new("ARMS", "2019-08-08"),
            Identity::Response("ContactId"),
            &["ContactId"],
            ReadSpec::new("SearchAlertContact", &["ContactIds"]),
        )
        .with_field(
            FieldSpec::required("alert_contact_name", FieldKind::String)
                .check(Check::LenBetween(1, 8)),
        )
        .with_field(FieldSpec::optional("email", FieldKind::String))
        .with_field(FieldSpec::optional("phone_num", FieldKind::String))
        .with_field(FieldSpec::optional("partition_num", FieldKind::Int).default(12))
        .with_field(
            FieldSpec::optional("identify_type", FieldKind::String)
                .check(Check::OneOf(&["ip", "userdefined"])),
        )
        .with_field(
            FieldSpec::optional("account_name", FieldKind::String).check(Check::Pattern(
                r"^[a-z][a-z0-9_]{1,14}[a-z0-9]$",
                "account name must be 2 to 16 lower-case characters",
            )),
        )
        .with_field(FieldSpec::optional("content", FieldKind::Json))
        .with_field(FieldSpec::computed("status", FieldKind::String))
        .with_rule(Rule::AtLeastOneOf(&["email", "phone_num"]))
        .with_rule(Rule::NonDecreasing("partition_num"))
    }

    fn declared(value: Value) -> DeclaredResource {
        DeclaredResource::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_resource_passes() {
        let d = declared(json!({"alert_contact_name": "ops", "email": "ops@example.com"}));
        assert!(validate(&spec(), &d).is_ok());
    }

    #[test]
    fn test_at_least_one_of_names_the_group() {
        let d = declared(json!({"alert_contact_name": "ops", "email": ""}));
        let err = validate(&spec(), &d).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("one of email, phone_num must be set"));
    }

    #[test]
    fn test_missing_required_and_unknown_attributes() {
        let d = declared(json!({"email": "a@b.c", "colour": "blue"}));
        let diagnostics = diagnose(&spec(), d.attributes());
        assert!(diagnostics.contains(&"unsupported attribute 'colour'".to_string()));
        assert!(diagnostics.contains(&"missing required attribute 'alert_contact_name'".to_string()));
    }

    #[test]
    fn test_computed_attribute_cannot_be_set() {
        let d = declared(json!({"alert_contact_name": "ops", "email": "a@b.c", "status": "1"}));
        let err = validate(&spec(), &d).unwrap_err();
        assert!(err.to_string().contains("'status' is computed"));
    }

    #[test]
    fn test_type_and_value_checks() {
        let d = declared(json!({
            "alert_contact_name": "far-too-long-name",
            "email": "a@b.c",
            "partition_num": true,
            "identify_type": "hostname",
            "account_name": "Admin",
            "content": "{not json"
        }));
        let diagnostics = diagnose(&spec(), d.attributes());
        assert_eq!(diagnostics.len(), 5, "{:?}", diagnostics);
        assert!(diagnostics.iter().any(|d| d.contains("length must be between 1 and 8")));
        assert!(diagnostics.iter().any(|d| d.contains("'partition_num': expected integer")));
        assert!(diagnostics.iter().any(|d| d.contains("must be one of ip, userdefined")));
        assert!(diagnostics.iter().any(|d| d.contains("2 to 16 lower-case")));
        assert!(diagnostics.iter().any(|d| d.contains("invalid JSON document")));
    }

    #[test]
    fn test_apply_defaults_fills_unset_only() {
        let d = apply_defaults(&spec(), &declared(json!({"alert_contact_name": "ops"})));
        assert_eq!(d.get("partition_num"), Some(&json!(12)));

        let d = apply_defaults(&spec(), &declared(json!({"partition_num": 24})));
        assert_eq!(d.get("partition_num"), Some(&json!(24)));
    }

    #[test]
    fn test_non_decreasing_transition() {
        let prior = json!({"partition_num": 12}).as_object().unwrap().clone();
        let shrink = declared(json!({"partition_num": 6}));
        let err = check_transition(&spec(), &prior, &shrink).unwrap_err();
        assert!(err.to_string().contains("partition_num can only be adjusted to a greater value"));

        let grow = declared(json!({"partition_num": 24}));
        assert!(check_transition(&spec(), &prior, &grow).is_ok());
    }

    #[test]
    fn test_as_int_accepts_numeric_strings() {
        assert_eq!(as_int(&json!(5)), Some(5));
        assert_eq!(as_int(&json!("12")), Some(12));
        assert_eq!(as_int(&json!("twelve")), None);
    }
}

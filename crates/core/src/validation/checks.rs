//! Per-field checks — pure logic, no database access.
//!
//! Severity ladder: missing required values and unparseable/ill-typed
//! values are errors; length overruns and suspicious-but-usable values
//! (negative amounts) are warnings. Duplicate detection needs tenant
//! data and therefore lives in the orchestration layer, which appends
//! its `probable_duplicate` warnings to the list produced here.

use serde_json::{Map, Value};
use validator::ValidateEmail;

use super::FieldIssue;
use crate::mapping::{normalize_decimal_str, parse_flexible_date};
use crate::schema::{FieldType, TargetField, TargetSchema};

/// Run every schema-driven check against one mapped row.
pub fn check_row(schema: &TargetSchema, row: &Map<String, Value>) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    for field in &schema.fields {
        check_field(field, row.get(&field.name), &mut issues);
    }
    issues
}

fn check_field(field: &TargetField, value: Option<&Value>, issues: &mut Vec<FieldIssue>) {
    let Some(value) = value.filter(|v| !is_blank(v)) else {
        if field.required {
            issues.push(FieldIssue::error(
                &field.name,
                "required",
                format!("{} is required", field.label),
            ));
        }
        return;
    };

    match field.field_type {
        FieldType::Text => {}
        FieldType::Integer => check_integer(field, value, issues),
        FieldType::Decimal => check_decimal(field, value, issues),
        FieldType::Date => check_date(field, value, issues),
        FieldType::Email => check_email(field, value, issues),
        FieldType::Enum => check_enum(field, value, issues),
    }
    check_max_length(field, value, issues);
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_integer(field: &TargetField, value: &Value, issues: &mut Vec<FieldIssue>) {
    let ok = match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    };
    if !ok {
        issues.push(FieldIssue::error(
            &field.name,
            "invalid_integer",
            format!("{} must be a whole number", field.label),
        ));
    }
}

fn check_decimal(field: &TargetField, value: &Value, issues: &mut Vec<FieldIssue>) {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => normalize_decimal_str(s).parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        None => issues.push(FieldIssue::error(
            &field.name,
            "invalid_decimal",
            format!("{} must be a number", field.label),
        )),
        Some(v) if v < 0.0 => issues.push(FieldIssue::warning(
            &field.name,
            "negative_amount",
            format!("{} is negative", field.label),
        )),
        Some(_) => {}
    }
}

fn check_date(field: &TargetField, value: &Value, issues: &mut Vec<FieldIssue>) {
    let ok = value
        .as_str()
        .is_some_and(|s| parse_flexible_date(s).is_some());
    if !ok {
        issues.push(FieldIssue::error(
            &field.name,
            "invalid_date",
            format!("{} must be a date (e.g. 2024-12-31)", field.label),
        ));
    }
}

fn check_email(field: &TargetField, value: &Value, issues: &mut Vec<FieldIssue>) {
    let ok = value.as_str().is_some_and(|s| s.trim().validate_email());
    if !ok {
        issues.push(FieldIssue::error(
            &field.name,
            "invalid_email",
            format!("{} must be a valid email address", field.label),
        ));
    }
}

fn check_enum(field: &TargetField, value: &Value, issues: &mut Vec<FieldIssue>) {
    let Some(allowed) = field.allowed_values.as_deref() else {
        return;
    };
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if !allowed.iter().any(|a| a == &text) {
        issues.push(FieldIssue::error(
            &field.name,
            "invalid_enum_value",
            format!("{} must be one of: {}", field.label, allowed.join(", ")),
        ));
    }
}

fn check_max_length(field: &TargetField, value: &Value, issues: &mut Vec<FieldIssue>) {
    let Some(max) = field.max_length else {
        return;
    };
    if value.as_str().is_some_and(|s| s.chars().count() > max) {
        issues.push(FieldIssue::warning(
            &field.name,
            "max_length",
            format!("{} exceeds the maximum length of {max}", field.label),
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ValidationStatus;
    use crate::validation::{classify, IssueSeverity};
    use serde_json::json;

    fn schema() -> TargetSchema {
        TargetSchema::new(
            "customer",
            vec![
                TargetField::new("code", "Code", FieldType::Text)
                    .required()
                    .max_length(8),
                TargetField::new("name", "Name", FieldType::Text).required(),
                TargetField::new("email", "Email", FieldType::Email),
                TargetField::new("price", "Price", FieldType::Decimal),
                TargetField::new("count", "Count", FieldType::Integer),
                TargetField::new("since", "Customer Since", FieldType::Date),
                TargetField::new("kind", "Kind", FieldType::Enum).allowed(&["person", "company"]),
            ],
        )
    }

    fn row(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn codes(issues: &[FieldIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn clean_row_has_no_issues() {
        let issues = check_row(
            &schema(),
            &row(json!({
                "code": "C-1",
                "name": "Acme",
                "email": "info@acme.test",
                "price": "1.234,56",
                "count": 3,
                "since": "31.12.2020",
                "kind": "company",
            })),
        );
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn missing_and_blank_required_fields_error() {
        let issues = check_row(&schema(), &row(json!({"name": "   "})));
        assert_eq!(codes(&issues), vec!["required", "required"]);
        assert_eq!(issues[0].field, "code");
        assert_eq!(issues[1].field, "name");
        assert_eq!(classify(&issues), ValidationStatus::Error);
    }

    #[test]
    fn optional_blank_fields_are_ignored() {
        let issues = check_row(
            &schema(),
            &row(json!({"code": "C", "name": "Acme", "email": "", "price": null})),
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn unparseable_decimal_errors_negative_warns() {
        let issues = check_row(
            &schema(),
            &row(json!({"code": "C", "name": "A", "price": "abc"})),
        );
        assert_eq!(codes(&issues), vec!["invalid_decimal"]);

        let issues = check_row(
            &schema(),
            &row(json!({"code": "C", "name": "A", "price": "-10,5"})),
        );
        assert_eq!(codes(&issues), vec!["negative_amount"]);
        assert_eq!(issues[0].severity, IssueSeverity::Warning);
        assert_eq!(classify(&issues), ValidationStatus::Warning);
    }

    #[test]
    fn integer_rejects_fractions_and_garbage() {
        let base = json!({"code": "C", "name": "A"});
        for bad in [json!(2.5), json!("2.5"), json!("many"), json!(true)] {
            let mut r = row(base.clone());
            r.insert("count".into(), bad.clone());
            let issues = check_row(&schema(), &r);
            assert_eq!(codes(&issues), vec!["invalid_integer"], "value {bad}");
        }
    }

    #[test]
    fn date_accepts_known_formats_only() {
        let mut r = row(json!({"code": "C", "name": "A"}));
        r.insert("since".into(), json!("12.31.2024"));
        assert_eq!(codes(&check_row(&schema(), &r)), vec!["invalid_date"]);

        r.insert("since".into(), json!("2024-12-31"));
        assert!(check_row(&schema(), &r).is_empty());
    }

    #[test]
    fn email_syntax_is_enforced() {
        let mut r = row(json!({"code": "C", "name": "A"}));
        r.insert("email".into(), json!("not-an-address"));
        assert_eq!(codes(&check_row(&schema(), &r)), vec!["invalid_email"]);
    }

    #[test]
    fn enum_membership_is_enforced() {
        let mut r = row(json!({"code": "C", "name": "A"}));
        r.insert("kind".into(), json!("robot"));
        let issues = check_row(&schema(), &r);
        assert_eq!(codes(&issues), vec!["invalid_enum_value"]);
        assert!(issues[0].message.contains("person, company"));
    }

    #[test]
    fn overlong_value_warns() {
        let issues = check_row(
            &schema(),
            &row(json!({"code": "LONGER-THAN-8", "name": "A"})),
        );
        assert_eq!(codes(&issues), vec!["max_length"]);
        assert_eq!(classify(&issues), ValidationStatus::Warning);
    }
}

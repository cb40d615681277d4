//! Flattens CRM contacts into dashboard rows.
//!
//! Custom fields are looked up through a fixed sequence of resolver
//! strategies; the first hit wins and nothing is merged across strategies.
//! Locations differ in where they store the same field (a direct contact
//! property on some, a custom-field entry on others), so every lookup walks
//! the same sequence.

use chrono::Datelike;

use crate::config::FieldKeys;
use crate::models::{Contact, CustomField, SalesRow};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

type Resolver = fn(&Contact, &str) -> Option<String>;

/// Lookup strategies in precedence order.
const RESOLVERS: [Resolver; 2] = [direct_property, custom_field_entry];

/// Flatten one contact into a sheet row.
pub fn sales_row(contact: &Contact, location_name: &str, keys: &FieldKeys) -> SalesRow {
    let signup = contact.signup_time().map(|t| t.date_naive());

    SalesRow {
        contact_id: contact.id.clone(),
        location: location_name.to_string(),
        full_name: contact.full_name(),
        email: contact.email.clone().unwrap_or_default(),
        signup_date: signup
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        tour_member: resolve_field(contact, &keys.tour_team_member),
        sale_member: resolve_field(contact, &keys.sale_team_member),
        same_day_sale: default_no(resolve_field(contact, &keys.same_day_sale)),
        day_one_booked: default_no(resolve_field(contact, &keys.day_one_booked)),
        sale_tagged: "Yes".to_string(),
        month: signup
            .map(|d| MONTH_NAMES[d.month0() as usize].to_string())
            .unwrap_or_default(),
        year: signup.map(|d| d.year().to_string()).unwrap_or_default(),
    }
}

/// Resolve a custom field to cell text, empty when no strategy hits.
fn resolve_field(contact: &Contact, key: &str) -> String {
    RESOLVERS
        .iter()
        .find_map(|resolve| resolve(contact, key))
        .unwrap_or_default()
}

fn default_no(value: String) -> String {
    if value.is_empty() {
        "No".to_string()
    } else {
        value
    }
}

/// Strategy 1: a property stored directly on the contact object, taken only
/// when its value is truthy so that placeholder nulls, empty strings and
/// zeroes fall through to the next strategy.
fn direct_property(contact: &Contact, key: &str) -> Option<String> {
    contact.extra.get(key).and_then(truthy_text)
}

/// Strategy 2: the first custom-field entry whose key equals the field key,
/// whose id contains it, or whose display name normalizes to it.
fn custom_field_entry(contact: &Contact, key: &str) -> Option<String> {
    contact
        .custom_fields
        .iter()
        .find(|field| entry_matches(field, key))
        .map(|field| value_text(&field.value))
}

fn entry_matches(field: &CustomField, key: &str) -> bool {
    if field.key.as_deref() == Some(key) {
        return true;
    }
    if field
        .id
        .as_deref()
        .map(|id| id.contains(key))
        .unwrap_or(false)
    {
        return true;
    }
    field
        .name
        .as_deref()
        .map(|name| normalize_label(name) == key)
        .unwrap_or(false)
}

/// Lowercase a display name and collapse whitespace runs to underscores, so
/// "Sale Team Member" matches the key `sale_team_member`.
fn normalize_label(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Cell text for a truthy scalar; None for null, false, zero, empty strings
/// and anything non-scalar.
fn truthy_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Bool(true) => Some("true".to_string()),
        serde_json::Value::Number(n) if n.as_f64().unwrap_or(0.0) != 0.0 => Some(n.to_string()),
        _ => None,
    }
}

/// Cell text for a custom-field value. Multi-select fields arrive as arrays
/// and are joined the way the dashboard displays them.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(json: &str) -> Contact {
        serde_json::from_str(json).expect("test contact should parse")
    }

    fn keys() -> FieldKeys {
        FieldKeys::default()
    }

    #[test]
    fn test_flags_default_to_no() {
        let row = sales_row(&contact(r#"{"id": "x"}"#), "Salem", &keys());
        assert_eq!(row.same_day_sale, "No");
        assert_eq!(row.day_one_booked, "No");
        assert_eq!(row.sale_tagged, "Yes");
    }

    #[test]
    fn test_flag_passes_through_when_set() {
        let row = sales_row(
            &contact(r#"{"id": "x", "same_day_sale": "Yes"}"#),
            "Salem",
            &keys(),
        );
        assert_eq!(row.same_day_sale, "Yes");
    }

    #[test]
    fn test_direct_property_beats_custom_field() {
        let json = r#"{
            "id": "x",
            "sale_team_member": "Direct Dana",
            "customFields": [{"key": "sale_team_member", "value": "Collection Carl"}]
        }"#;
        let row = sales_row(&contact(json), "Salem", &keys());
        assert_eq!(row.sale_member, "Direct Dana");
    }

    #[test]
    fn test_falsy_direct_property_falls_through() {
        let json = r#"{
            "id": "x",
            "sale_team_member": "",
            "customFields": [{"key": "sale_team_member", "value": "Carl"}]
        }"#;
        let row = sales_row(&contact(json), "Salem", &keys());
        assert_eq!(row.sale_member, "Carl");

        let null_json = r#"{
            "id": "x",
            "tour_team_member": null,
            "customFields": [{"key": "tour_team_member", "value": "Tina"}]
        }"#;
        let row = sales_row(&contact(null_json), "Salem", &keys());
        assert_eq!(row.tour_member, "Tina");
    }

    #[test]
    fn test_entry_matched_by_id_substring() {
        let json = r#"{
            "id": "x",
            "customFields": [
                {"id": "loc1_day_one_booked_v2", "value": "Yes"}
            ]
        }"#;
        let row = sales_row(&contact(json), "Salem", &keys());
        assert_eq!(row.day_one_booked, "Yes");
    }

    #[test]
    fn test_entry_matched_by_display_name() {
        let json = r#"{
            "id": "x",
            "customFields": [
                {"id": "3v9VXwQr", "name": "Sale  Team Member", "value": "Dana"}
            ]
        }"#;
        let row = sales_row(&contact(json), "Salem", &keys());
        assert_eq!(row.sale_member, "Dana");
    }

    #[test]
    fn test_unresolved_field_is_empty() {
        let json = r#"{"id": "x", "customFields": [{"id": "unrelated", "value": "zzz"}]}"#;
        let row = sales_row(&contact(json), "Salem", &keys());
        assert_eq!(row.sale_member, "");
        assert_eq!(row.tour_member, "");
    }

    #[test]
    fn test_date_decomposition() {
        let row = sales_row(
            &contact(r#"{"id": "x", "dateAdded": "2024-03-15T10:30:00.000Z"}"#),
            "Salem",
            &keys(),
        );
        assert_eq!(row.signup_date, "2024-03-15");
        assert_eq!(row.month, "March");
        assert_eq!(row.year, "2024");
    }

    #[test]
    fn test_missing_date_leaves_date_cells_empty() {
        let row = sales_row(&contact(r#"{"id": "x"}"#), "Salem", &keys());
        assert_eq!(row.signup_date, "");
        assert_eq!(row.month, "");
        assert_eq!(row.year, "");
    }

    #[test]
    fn test_december_boundary() {
        let row = sales_row(
            &contact(r#"{"id": "x", "dateAdded": "2023-12-31T23:59:59Z"}"#),
            "Salem",
            &keys(),
        );
        assert_eq!(row.month, "December");
        assert_eq!(row.year, "2023");
    }

    #[test]
    fn test_multi_select_values_joined() {
        let json = r#"{
            "id": "x",
            "customFields": [{"key": "sale_team_member", "value": ["Dana", "Carl"]}]
        }"#;
        let row = sales_row(&contact(json), "Salem", &keys());
        assert_eq!(row.sale_member, "Dana, Carl");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Sale Team Member"), "sale_team_member");
        assert_eq!(normalize_label("  Same   Day  Sale "), "same_day_sale");
        assert_eq!(normalize_label("email"), "email");
    }

    #[test]
    fn test_truthy_text() {
        use serde_json::json;
        assert_eq!(truthy_text(&json!("Dana")), Some("Dana".to_string()));
        assert_eq!(truthy_text(&json!(true)), Some("true".to_string()));
        assert_eq!(truthy_text(&json!(7)), Some("7".to_string()));
        assert_eq!(truthy_text(&json!("")), None);
        assert_eq!(truthy_text(&json!(false)), None);
        assert_eq!(truthy_text(&json!(0)), None);
        assert_eq!(truthy_text(&json!(null)), None);
        assert_eq!(truthy_text(&json!(["a"])), None);
    }
}

use crate::errors::EnrichmentError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Host modules whose records are people.
pub const PERSON_MODULES: &[&str] = &["Contacts", "Leads", "Prospects"];

/// Host modules whose records are companies.
pub const ORGANIZATION_MODULES: &[&str] = &["Accounts"];

// ============ Subjects ============

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Person {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Organization {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A record that can be sent to the enrichment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Person(Person),
    Organization(Organization),
}

impl Subject {
    /// Builds the request payload for this subject.
    pub fn to_request(&self) -> EnrichmentRequest {
        match self {
            Subject::Person(p) => EnrichmentRequest::Person {
                full_name: p.full_name.clone(),
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
                email: vec![EmailEntry {
                    email_address: p.email.clone(),
                }],
            },
            Subject::Organization(o) => EnrichmentRequest::Organization {
                name: o.name.clone(),
                email: vec![EmailEntry {
                    email_address: o.email.clone(),
                }],
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Person(_) => "person",
            Subject::Organization(_) => "organization",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailEntry {
    pub email_address: Option<String>,
}

/// Payload carried in the `bean` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnrichmentRequest {
    Person {
        full_name: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Vec<EmailEntry>,
    },
    Organization {
        name: Option<String>,
        email: Vec<EmailEntry>,
    },
}

impl From<&Subject> for EnrichmentRequest {
    fn from(subject: &Subject) -> Self {
        subject.to_request()
    }
}

// ============ Service response ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrichmentResponse {
    #[serde(default)]
    pub enriched: bool,
    #[serde(default, deserialize_with = "empty_as_default")]
    pub bean: Map<String, Value>,
    #[serde(default, rename = "collectedData", deserialize_with = "empty_as_default")]
    pub collected_data: CollectedData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedData {
    #[serde(default, deserialize_with = "empty_as_default")]
    pub images: Vec<CollectedImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedImage {
    #[serde(default)]
    pub url: Option<String>,
}

/// `null` and `[]` read as the default value. The service encodes an empty
/// object as an empty array.
fn empty_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(T::default()),
        Value::Array(items) if items.is_empty() => Ok(T::default()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

impl EnrichmentResponse {
    /// Reads a parsed body. A body that does not have the expected shape is
    /// `None`, which callers treat as "not enriched".
    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn first_image_url(&self) -> Option<&str> {
        self.collected_data
            .images
            .first()
            .and_then(|img| img.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

// ============ Translated fields ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValue {
    pub attribute: String,
    pub value: Value,
}

/// Ordered attribute/value pairs produced from an enriched response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppliedFields {
    pub fields: Vec<FieldValue>,
}

impl AppliedFields {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.attribute == attribute)
            .map(|f| &f.value)
    }

    pub fn push(&mut self, attribute: impl Into<String>, value: Value) {
        self.fields.push(FieldValue {
            attribute: attribute.into(),
            value,
        });
    }

    /// Writes every pair the record accepts and returns the attributes that
    /// were actually written. Populated attributes are left untouched.
    pub fn apply_to<R: TargetRecord + ?Sized>(&self, record: &mut R) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| record.set_if_empty(&f.attribute, &f.value))
            .map(|f| f.attribute.clone())
            .collect()
    }
}

// ============ Host record ============

/// Read side of a host record.
pub trait SubjectSource {
    /// `None` when the record's type is not enrichable.
    fn subject(&self) -> Option<Subject>;
}

/// Write side of a host record.
pub trait TargetRecord {
    /// Writes `value` only if `attribute` is declared and currently empty.
    fn set_if_empty(&mut self, attribute: &str, value: &Value) -> bool;

    fn persist(&mut self) -> Result<(), EnrichmentError>;
}

/// A host record as handed over by the workflow engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub module: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub field_defs: BTreeSet<String>,
    #[serde(default)]
    pub persisted: bool,
}

impl Record {
    pub fn new(id: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.field_defs.insert(name.to_string());
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn with_defs<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.field_defs
            .extend(names.into_iter().map(|n| n.to_string()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// First address of the `email` list, falling back to `email1`.
    pub fn primary_email(&self) -> Option<String> {
        match self.fields.get("email") {
            Some(Value::Array(list)) => list.first().and_then(|entry| match entry {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("email_address")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                _ => None,
            }),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => self.text("email1"),
        }
    }
}

impl SubjectSource for Record {
    fn subject(&self) -> Option<Subject> {
        let module = self.module.as_str();
        if PERSON_MODULES.contains(&module) {
            Some(Subject::Person(Person {
                full_name: self.text("full_name"),
                first_name: self.text("first_name"),
                last_name: self.text("last_name"),
                email: self.primary_email(),
            }))
        } else if ORGANIZATION_MODULES.contains(&module) {
            Some(Subject::Organization(Organization {
                name: self.text("name"),
                email: self.primary_email(),
            }))
        } else {
            None
        }
    }
}

impl TargetRecord for Record {
    fn set_if_empty(&mut self, attribute: &str, value: &Value) -> bool {
        if !self.field_defs.contains(attribute) || !is_empty_value(self.fields.get(attribute)) {
            return false;
        }
        self.fields.insert(attribute.to_string(), value.clone());
        true
    }

    fn persist(&mut self) -> Result<(), EnrichmentError> {
        self.persisted = true;
        Ok(())
    }
}

/// Host notion of "empty": missing, null, false, zero, `""`, `"0"`, or an
/// empty collection.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty() || s == "0",
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_person_request_shape() {
        let record = Record::new("1", "Contacts")
            .with_field("full_name", json!("Jane Doe"))
            .with_field("first_name", json!("Jane"))
            .with_field("last_name", json!("Doe"))
            .with_field("email", json!([{"email_address": "jane@acme.io"}, {"email_address": "j@home.io"}]));

        let request = record.subject().unwrap().to_request();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "full_name": "Jane Doe",
                "first_name": "Jane",
                "last_name": "Doe",
                "email": [{"email_address": "jane@acme.io"}]
            })
        );
    }

    #[test]
    fn test_organization_request_shape() {
        let record = Record::new("2", "Accounts")
            .with_field("name", json!("Acme"))
            .with_field("email1", json!("info@acme.io"));

        let request = EnrichmentRequest::from(&record.subject().unwrap());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Acme", "email": [{"email_address": "info@acme.io"}]})
        );
    }

    #[test]
    fn test_request_is_deterministic() {
        let record = Record::new("3", "Leads").with_field("first_name", json!("Al"));
        let a = serde_json::to_string(&record.subject().unwrap().to_request()).unwrap();
        let b = serde_json::to_string(&record.subject().unwrap().to_request()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unsupported_module_has_no_subject() {
        assert!(Record::new("4", "Opportunities").subject().is_none());
        assert!(Record::new("5", "Cases").subject().is_none());
    }

    #[test]
    fn test_set_if_empty_respects_schema_and_existing_values() {
        let mut record = Record::new("6", "Contacts")
            .with_field("title", json!("CTO"))
            .with_defs(["website", "hint_phone_c"]);

        assert!(!record.set_if_empty("title", &json!("Engineer")));
        assert!(!record.set_if_empty("undeclared", &json!("x")));
        assert!(record.set_if_empty("website", &json!("acme.io")));
        assert!(!record.set_if_empty("website", &json!("other.io")));

        assert_eq!(record.get("title"), Some(&json!("CTO")));
        assert_eq!(record.get("website"), Some(&json!("acme.io")));
        assert!(record.get("undeclared").is_none());
    }

    #[test]
    fn test_zero_like_values_are_empty() {
        for v in [json!(null), json!(""), json!("0"), json!(0), json!(false), json!([]), json!({})] {
            assert!(is_empty_value(Some(&v)), "{v} should be empty");
        }
        for v in [json!("a"), json!(1), json!(true), json!("0.0"), json!([1])] {
            assert!(!is_empty_value(Some(&v)), "{v} should not be empty");
        }
    }

    #[test]
    fn test_response_from_json_handles_missing_parts() {
        let resp = EnrichmentResponse::from_json(&json!({"enriched": true})).unwrap();
        assert!(resp.enriched);
        assert!(resp.bean.is_empty());
        assert!(resp.first_image_url().is_none());

        assert!(EnrichmentResponse::from_json(&json!("nope")).is_none());
    }

    #[test]
    fn test_response_bean_as_empty_array() {
        let resp = EnrichmentResponse::from_json(&json!({
            "enriched": true,
            "bean": [],
            "collectedData": {"images": [{"url": "http://x/p.png"}]}
        }))
        .unwrap();

        assert!(resp.bean.is_empty());
        assert_eq!(resp.first_image_url(), Some("http://x/p.png"));
    }

    #[test]
    fn test_response_null_collected_data() {
        let resp = EnrichmentResponse::from_json(&json!({
            "enriched": true,
            "bean": {"phone": "555"},
            "collectedData": null
        }))
        .unwrap();

        assert_eq!(resp.bean.get("phone"), Some(&json!("555")));
        assert!(resp.first_image_url().is_none());
    }

    #[test]
    fn test_response_null_images() {
        let resp = EnrichmentResponse::from_json(&json!({
            "enriched": true,
            "bean": {"phone": "555"},
            "collectedData": {"images": null}
        }))
        .unwrap();

        assert!(resp.collected_data.images.is_empty());
        assert_eq!(resp.bean.len(), 1);
    }

    #[test]
    fn test_response_bean_null_and_collected_data_array() {
        let resp = EnrichmentResponse::from_json(&json!({
            "enriched": true,
            "bean": null,
            "collectedData": []
        }))
        .unwrap();

        assert!(resp.enriched);
        assert!(resp.bean.is_empty());
    }
}

//! Translation of enrichment service fields into host record attributes.
//!
//! Raw bean keys are rewritten through the `hint_<field>_c` template unless
//! they appear in the non-mapped set. Skipped keys never leave the
//! translator, aliased keys are renamed, and social handles are expanded to
//! URLs.

use crate::models::{is_empty_value, AppliedFields, EnrichmentResponse};
use serde_json::{Map, Value};

/// Bean fields concatenated into the synthetic industry tags entry.
pub const TAG_FIELDS: [&str; 4] = ["account_tag", "account_tag_2", "account_tag_3", "account_tag_4"];

/// Synthetic key holding the comma-joined tags.
pub const INDUSTRY_TAGS_KEY: &str = "industry_tags";

/// Synthetic key holding the first collected image URL.
pub const PHOTO_KEY: &str = "photo";

/// Static lookup tables that drive the translation.
#[derive(Debug, Clone, Copy)]
pub struct FieldMappingRules {
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub skip: &'static [&'static str],
    pub non_mapped: &'static [&'static str],
    pub aliases: &'static [(&'static str, &'static str)],
    pub url_prefixes: &'static [(&'static str, &'static str)],
}

/// The process-wide mapping used for Hint enrichment.
pub static HINT_RULES: FieldMappingRules = FieldMappingRules {
    prefix: "hint_",
    suffix: "_c",
    skip: &["hint_account_logo_c", "hint_photo_c"],
    non_mapped: &["account_name", "title"],
    aliases: &[("hint_account_website_c", "website")],
    url_prefixes: &[
        ("hint_account_twitter_handle_c", "www.twitter.com/"),
        ("hint_account_facebook_handle_c", "www.facebook.com/"),
        ("hint_account_linkedin_handle_c", "www.linkedin.com/"),
    ],
};

impl FieldMappingRules {
    /// Applies the prefix template unless the field is in the non-mapped set.
    pub fn target_name(&self, field: &str) -> String {
        if self.non_mapped.contains(&field) {
            field.to_string()
        } else {
            format!("{}{}{}", self.prefix, field, self.suffix)
        }
    }

    pub fn is_skipped(&self, attribute: &str) -> bool {
        self.skip.contains(&attribute)
    }

    pub fn alias(&self, attribute: &str) -> Option<&'static str> {
        lookup(self.aliases, attribute)
    }

    pub fn url_prefix(&self, attribute: &str) -> Option<&'static str> {
        lookup(self.url_prefixes, attribute)
    }

    /// Turns an enriched response into ordered attribute/value pairs.
    ///
    /// Raw bean keys keep their response order; the synthetic industry tags
    /// go through the template like any bean key, while the collected photo
    /// URL is emitted as `photo` directly.
    pub fn translate(&self, response: &EnrichmentResponse) -> AppliedFields {
        let mut bean: Map<String, Value> = response.bean.clone();

        if let Some(tags) = join_tags(&bean) {
            bean.insert(INDUSTRY_TAGS_KEY.to_string(), Value::String(tags));
        }

        let mut renamed: Vec<(String, Value)> = bean
            .into_iter()
            .map(|(field, value)| (self.target_name(&field), value))
            .collect();

        if let Some(url) = response.first_image_url() {
            renamed.push((PHOTO_KEY.to_string(), Value::String(url.to_string())));
        }

        let mut out = AppliedFields::default();
        for (key, value) in renamed {
            if self.is_skipped(&key) || is_falsy_numeric(&value) || value.is_null() {
                continue;
            }

            let key = self.alias(&key).map(String::from).unwrap_or(key);

            let value = match self.url_prefix(&key) {
                Some(prefix) => Value::String(format!("{}{}", prefix, scalar_text(&value))),
                None => value,
            };

            out.push(key, value);
        }
        out
    }
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn join_tags(bean: &Map<String, Value>) -> Option<String> {
    let tags: Vec<String> = TAG_FIELDS
        .iter()
        .filter_map(|tag| bean.get(*tag))
        .filter(|v| !is_empty_value(Some(*v)))
        .map(scalar_text)
        .collect();

    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

/// Zero numbers and the string `"0"` carry no data.
///
/// A legitimate zero (a revenue of 0, say) is dropped as well; callers
/// cannot tell it apart from a missing value.
pub fn is_falsy_numeric(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s == "0",
        _ => false,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

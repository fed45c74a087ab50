use std::ops::Deref;

use indexmap::IndexMap;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw attribute value as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Plain JSON number.
    Number(f64),
    /// Boolean flag; never numeric.
    Flag(bool),
    /// Text, possibly holding a number (`"1850"`).
    Text(String),
    /// Nested object or array; present but never numeric.
    Other(Value),
}

impl AttributeValue {
    /// Numeric reading of the value, if any.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
            Self::Flag(_) | Self::Other(_) => None,
        };
        value.filter(|value| value.is_finite())
    }

    /// Reads the value as a monetary amount: `$` and `,` are ignored, and the
    /// result must be a finite non-negative number.
    #[must_use]
    pub fn as_amount(&self) -> Option<f64> {
        let amount = match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => {
                let cleaned: String = text
                    .trim()
                    .chars()
                    .filter(|ch| *ch != '$' && *ch != ',')
                    .collect();
                cleaned.trim().parse::<f64>().ok()
            }
            Self::Flag(_) | Self::Other(_) => None,
        };
        amount.filter(|value| value.is_finite() && *value >= 0.0)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One property as delivered by the data layer.
///
/// On the wire this is a flat JSON object: the assessed value lives under
/// `assessedValue` (or one of its aliases), everything else is an attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Optional identifier (parcel id, listing id). Numeric ids are kept in
    /// their decimal form.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Assessed or sale value.
    #[serde(
        rename = "assessedValue",
        alias = "assessed_value",
        alias = "salePrice",
        alias = "sale_price",
        alias = "value",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target: Option<AttributeValue>,
    /// Remaining attributes; `None` marks an explicit null.
    #[serde(flatten)]
    pub attributes: IndexMap<String, Option<AttributeValue>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "record id must be a string or number, found {other}"
        ))),
    }
}

impl PropertyRecord {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), Some(value.into()));
        self
    }

    /// Records an attribute as explicitly null.
    #[must_use]
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), None);
        self
    }

    /// Sets the assessed value.
    #[must_use]
    pub fn with_target(mut self, value: impl Into<AttributeValue>) -> Self {
        self.target = Some(value.into());
        self
    }

    /// Attribute value, when present and not null.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).and_then(Option::as_ref)
    }

    /// Whether the attribute is present and not null.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Numeric attribute value, when present and numeric.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(AttributeValue::as_number)
    }

    /// Whether a target value was supplied at all.
    #[must_use]
    pub const fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Target parsed as a non-negative amount.
    #[must_use]
    pub fn target_amount(&self) -> Option<f64> {
        self.target.as_ref().and_then(AttributeValue::as_amount)
    }

    /// Target usable for training and evaluation (parsable and positive).
    #[must_use]
    pub fn usable_target(&self) -> Option<f64> {
        self.target_amount().filter(|value| *value > 0.0)
    }
}

/// Ordered, duplicate-free list of attribute names used as regressors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(Vec<String>);

impl FeatureSet {
    /// Builds the set, keeping the first occurrence of repeated names.
    #[must_use]
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let mut features: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !features.iter().any(|existing| existing == name) {
                features.push(name.to_owned());
            }
        }
        Self(features)
    }

    /// Names in training order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl Deref for FeatureSet {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_flat_records() {
        let record: PropertyRecord = serde_json::from_value(json!({
            "id": "parcel-17",
            "squareFeet": 1850,
            "bedrooms": "3",
            "pool": true,
            "yearBuilt": null,
            "salePrice": "$325,000"
        }))
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("parcel-17"));
        assert_eq!(record.numeric("squareFeet"), Some(1850.0));
        assert_eq!(record.numeric("bedrooms"), Some(3.0));
        assert!(record.is_present("pool"));
        assert_eq!(record.numeric("pool"), None);
        assert!(!record.is_present("yearBuilt"));
        assert!(!record.is_present("lotSize"));
        assert_eq!(record.usable_target(), Some(325_000.0));
    }

    #[test]
    fn nested_attributes_are_present_but_not_numeric() {
        let record: PropertyRecord = serde_json::from_value(json!({
            "squareFeet": 1850,
            "address": { "street": "1 Main St" },
            "tags": ["corner"],
            "assessedValue": 300_000
        }))
        .unwrap();
        assert_eq!(record.numeric("squareFeet"), Some(1850.0));
        assert!(record.is_present("address"));
        assert_eq!(record.numeric("address"), None);
        assert_eq!(record.numeric("tags"), None);
        assert_eq!(record.usable_target(), Some(300_000.0));
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let record: PropertyRecord = serde_json::from_value(json!({
            "id": 17,
            "squareFeet": 1850,
            "assessedValue": 300_000
        }))
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("17"));
        assert!(!record.is_present("id"));

        let err = serde_json::from_value::<PropertyRecord>(json!({ "id": [1, 2] })).unwrap_err();
        assert!(err.to_string().contains("record id"));
    }

    #[test]
    fn target_parsing_rejects_negative_and_garbage() {
        let negative = PropertyRecord::new().with_target(-5.0);
        assert!(negative.has_target());
        assert_eq!(negative.target_amount(), None);

        let garbage = PropertyRecord::new().with_target("call for price");
        assert_eq!(garbage.target_amount(), None);

        let zero = PropertyRecord::new().with_target(0.0);
        assert_eq!(zero.target_amount(), Some(0.0));
        assert_eq!(zero.usable_target(), None);
    }

    #[test]
    fn feature_set_drops_duplicates_and_blanks() {
        let features = FeatureSet::new(&["squareFeet", " ", "bedrooms", "squareFeet"]);
        assert_eq!(features.names(), ["squareFeet", "bedrooms"]);
        assert_eq!(features.len(), 2);
    }
}

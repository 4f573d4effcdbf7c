use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::dynamodb::table::{ATTRIBUTES_FIELD, PARTITION_KEY};
use crate::error::{AttributesError, Result};

/// A user's attributes document.
///
/// The document is a map of named DynamoDB attribute values. It is stored as
/// the `attributes` map of the user's item, so any value DynamoDB accepts
/// inside a map is accepted here: strings, numbers, booleans, nulls, lists,
/// nested maps and sets.
///
/// Values can be set directly as [`AttributeValue`]s, through the typed
/// helpers, or from any `serde::Serialize` type.
///
/// # Example
///
/// ```
/// use persistent_attributes::dynamodb::Attributes;
///
/// let attributes = Attributes::new()
///     .set_string("favorite_color", "blue")
///     .set_number("launch_count", 3.0)
///     .set_bool("tutorial_done", true);
///
/// assert_eq!(attributes.get_number("launch_count"), Some(3.0));
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Attributes {
    pub(crate) values: HashMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing attribute map.
    pub fn from_map(values: HashMap<String, AttributeValue>) -> Self {
        Self { values }
    }

    /// Serializes `value` field by field into a document.
    ///
    /// `value` must serialize to a map (a struct or a map type).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            values: serde_dynamo::to_item(value)?,
        })
    }

    /// Inserts or overwrites `name`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Option<AttributeValue> {
        self.values.insert(name.into(), value)
    }

    /// Serializes `value` and stores it under `name`.
    pub fn insert_serialized<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let value: AttributeValue = serde_dynamo::to_attribute_value(value)?;
        self.values.insert(name.into(), value);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.values.remove(name)
    }

    /// Sets a string attribute.
    pub fn set_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, AttributeValue::S(value.into()));
        self
    }

    /// Sets a number attribute.
    ///
    /// DynamoDB transmits numbers as strings; the value is stored using its
    /// shortest `f64` representation. NaN and infinities have no DynamoDB
    /// representation: they are kept here but rejected by
    /// [`check_numbers`](Self::check_numbers) before any save.
    pub fn set_number(mut self, name: impl Into<String>, value: impl Into<f64>) -> Self {
        self.insert(name, AttributeValue::N(value.into().to_string()));
        self
    }

    pub fn set_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        self.insert(name, AttributeValue::Bool(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// Gets the value of an attribute as a string.
    ///
    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, name: &str) -> Option<&String> {
        self.values.get(name).and_then(|av| av.as_s().ok())
    }

    /// Gets the value of an attribute as a number (f64).
    ///
    /// Returns `None` if the attribute doesn't exist, is not a number, or can't be parsed as f64.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.values
            .get(name)
            .and_then(|av| av.as_n().ok())
            .and_then(|n| n.parse().ok())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|av| av.as_bool().ok()).copied()
    }

    /// Deserializes a single attribute. `Ok(None)` if it is absent.
    pub fn get_deserialized<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.values
            .get(name)
            .cloned()
            .map(serde_dynamo::from_attribute_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Deserializes the whole document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_dynamo::from_item(self.values.clone())?)
    }

    /// Fails with [`AttributesError::InvalidNumber`] if any number, including
    /// those nested in lists, maps and number sets, is not a finite decimal.
    pub fn check_numbers(&self) -> Result<()> {
        self.values
            .iter()
            .try_for_each(|(name, value)| check_number_value(name, value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.values.iter()
    }

    pub fn into_map(self) -> HashMap<String, AttributeValue> {
        self.values
    }
}

fn check_number_value(name: &str, value: &AttributeValue) -> Result<()> {
    let check = |n: &String| match n.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(()),
        _ => Err(AttributesError::InvalidNumber {
            name: name.to_string(),
            value: n.clone(),
        }),
    };

    match value {
        AttributeValue::N(n) => check(n),
        AttributeValue::Ns(ns) => ns.iter().try_for_each(check),
        AttributeValue::L(list) => list.iter().try_for_each(|v| check_number_value(name, v)),
        AttributeValue::M(map) => map
            .iter()
            .try_for_each(|(key, v)| check_number_value(&format!("{name}.{key}"), v)),
        _ => Ok(()),
    }
}

/// Builds the stored item `{id: S(user_id), attributes: M(document)}`.
pub(crate) fn to_stored_item(
    user_id: &str,
    attributes: &Attributes,
) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            PARTITION_KEY.to_string(),
            AttributeValue::S(user_id.to_string()),
        ),
        (
            ATTRIBUTES_FIELD.to_string(),
            AttributeValue::M(attributes.values.clone()),
        ),
    ])
}

/// Extracts the attributes document from a stored item.
pub(crate) fn from_stored_item(
    user_id: &str,
    mut item: HashMap<String, AttributeValue>,
) -> Result<Attributes> {
    match item.remove(ATTRIBUTES_FIELD) {
        Some(AttributeValue::M(values)) => Ok(Attributes { values }),
        Some(_) => Err(AttributesError::MalformedItem {
            user_id: user_id.to_string(),
            reason: format!("'{ATTRIBUTES_FIELD}' is not a map"),
        }),
        None => Err(AttributesError::MalformedItem {
            user_id: user_id.to_string(),
            reason: format!("'{ATTRIBUTES_FIELD}' is missing"),
        }),
    }
}

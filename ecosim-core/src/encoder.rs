use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;
use crate::schema::{CategoryGroup, FeatureSchema};

/// A single value as a user typed or selected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// Sparse user input, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord {
    fields: BTreeMap<String, RawValue>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<RawValue> {
        self.fields.remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A complete record for a lodgepole-pine-like site on soil type 10.
    pub fn example() -> Self {
        Self::new()
            .with("Elevation", 2596)
            .with("Aspect", 51)
            .with("Slope", 3)
            .with("Horizontal_Distance_To_Hydrology", 258)
            .with("Vertical_Distance_To_Hydrology", 0)
            .with("Horizontal_Distance_To_Roadways", 510)
            .with("Hillshade_9am", 221)
            .with("Hillshade_Noon", 232)
            .with("Hillshade_3pm", 148)
            .with("Horizontal_Distance_To_Fire_Points", 6279)
            .with("Soil_Type", 10)
    }
}

/// Dense, ordered predictor input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

impl Serialize for FeatureVector {
    /// Serializes as a JSON object in vector order. Whole numbers are written
    /// as integers, since the predictor declares integer fields.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            if value.fract() == 0.0 && value.abs() < 9.0e15 {
                map.serialize_entry(name, &(*value as i64))?;
            } else {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

/// Encode `record` into the exact vector layout declared by `schema`.
///
/// Continuous fields come first, in schema order. Every categorical group then
/// contributes one indicator per identifier in its full range, whether or not
/// the identifier is offered to users.
pub fn encode(
    record: &InputRecord,
    schema: &FeatureSchema,
) -> Result<FeatureVector, ValidationError> {
    let mut entries = Vec::with_capacity(schema.vector_len());

    for field in schema.continuous() {
        let value = parse_number(field, record.get(field))?;
        entries.push((field.clone(), value));
    }

    for group in schema.groups() {
        let selected = parse_category(group, record.get(group.field()))?;
        for id in group.ids() {
            let indicator = if id == selected { 1.0 } else { 0.0 };
            entries.push((group.indicator_key(id), indicator));
        }
    }

    debug_assert_eq!(entries.len(), schema.vector_len());
    Ok(FeatureVector { entries })
}

fn parse_number(field: &str, raw: Option<&RawValue>) -> Result<f64, ValidationError> {
    let invalid = |value: String| ValidationError::InvalidNumber {
        field: field.to_string(),
        value,
    };

    let value = match raw {
        None => None,
        Some(RawValue::Number(n)) => Some(*n),
        Some(RawValue::Text(s)) if s.trim().is_empty() => None,
        Some(RawValue::Text(s)) => Some(s.trim().parse::<f64>().map_err(|_| invalid(s.clone()))?),
    };

    let value = value.ok_or_else(|| ValidationError::MissingField {
        field: field.to_string(),
    })?;

    // `f64::from_str` accepts "inf" and "NaN"
    if !value.is_finite() {
        return Err(invalid(value.to_string()));
    }

    Ok(value)
}

fn parse_category(group: &CategoryGroup, raw: Option<&RawValue>) -> Result<u16, ValidationError> {
    let unknown = |value: String| ValidationError::UnknownCategory {
        field: group.field().to_string(),
        value,
    };

    match raw {
        None => Err(ValidationError::MissingField {
            field: group.field().to_string(),
        }),
        Some(RawValue::Text(s)) if s.trim().is_empty() => Err(ValidationError::MissingField {
            field: group.field().to_string(),
        }),
        Some(RawValue::Text(s)) => group.parse_id(s).ok_or_else(|| unknown(s.clone())),
        Some(RawValue::Number(n)) => {
            if n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(group.cardinality()) {
                Ok(*n as u16)
            } else {
                Err(unknown(n.to_string()))
            }
        }
    }
}

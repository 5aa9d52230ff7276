//! Column values.

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::schema::ColumnDefinition;

/// One element of a weight vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightedElement {
    pub value: String,
    pub weight: u32,
}

impl WeightedElement {
    pub fn new<S: Into<String>>(value: S, weight: u32) -> Self {
        WeightedElement {
            value: value.into(),
            weight,
        }
    }
}

/// The value of a data column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A scalar text value.
    Text(String),
    /// A vector of text elements.
    Vector(Vec<String>),
    /// A vector of text elements with per-element weights.
    WeightVector(Vec<WeightedElement>),
}

impl Value {
    /// Build a weight vector from `(element, weight)` pairs.
    pub fn weighted<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Value::WeightVector(
            elements
                .into_iter()
                .map(|(value, weight)| WeightedElement::new(value, weight))
                .collect(),
        )
    }

    /// The text of a scalar value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Elements as `(text, weight)` pairs. A scalar is one element; plain
    /// vector elements weigh 0.
    pub fn elements(&self) -> Vec<(&str, u32)> {
        match self {
            Value::Text(text) => vec![(text.as_str(), 0)],
            Value::Vector(elements) => elements.iter().map(|e| (e.as_str(), 0)).collect(),
            Value::WeightVector(elements) => elements
                .iter()
                .map(|e| (e.value.as_str(), e.weight))
                .collect(),
        }
    }

    /// Weight of the element at `index` of a weight vector.
    pub fn weight_at(&self, index: usize) -> Option<u32> {
        match self {
            Value::WeightVector(elements) => elements.get(index).map(|e| e.weight),
            _ => None,
        }
    }

    /// Check this value against `column` and convert it to the column's
    /// shape. A plain vector stored in a weight vector column gets weight 0
    /// for every element.
    pub fn conform(self, column: &ColumnDefinition) -> Result<Value> {
        let value = match (self, column.vector, column.with_weight) {
            (value @ Value::Text(_), false, _) => value,
            (value @ Value::Vector(_), true, false) => value,
            (value @ Value::WeightVector(_), true, true) => value,
            (Value::Vector(elements), true, true) => Value::WeightVector(
                elements
                    .into_iter()
                    .map(|value| WeightedElement { value, weight: 0 })
                    .collect(),
            ),
            (value, _, _) => {
                return Err(GlaiveError::invalid_argument(format!(
                    "{} value does not fit column '{}'",
                    value.kind_name(),
                    column.name
                )));
            }
        };

        let max_len = column.column_type.max_len();
        if let Some((text, _)) = value.elements().into_iter().find(|(text, _)| text.len() > max_len) {
            return Err(GlaiveError::invalid_argument(format!(
                "value of {} bytes exceeds the {max_len} byte limit of column '{}'",
                text.len(),
                column.name
            )));
        }
        Ok(value)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Vector(_) => "vector",
            Value::WeightVector(_) => "weight vector",
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Vec<&str>> for Value {
    fn from(elements: Vec<&str>) -> Self {
        Value::Vector(elements.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(elements: Vec<String>) -> Self {
        Value::Vector(elements)
    }
}

impl From<Vec<WeightedElement>> for Value {
    fn from(elements: Vec<WeightedElement>) -> Self {
        Value::WeightVector(elements)
    }
}

// Dweve Neogm - Object-Graph Mapping for Property Graphs
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Property converters consulted by the compiler and the mapper.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::cypher::CypherValue;

/// A converter rejected a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

impl ConversionError {
    /// Create a new conversion error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Converts a field value between its entity-side and graph-side forms.
///
/// Failures in either direction are recoverable: the caller records a
/// warning and leaves the field unset.
pub trait AttributeConverter: fmt::Debug + Send + Sync {
    /// Convert an entity attribute into a storable graph property.
    fn to_graph_property(&self, value: &CypherValue) -> Result<CypherValue, ConversionError>;

    /// Convert a stored graph property into an entity attribute.
    fn to_entity_attribute(&self, value: &CypherValue) -> Result<CypherValue, ConversionError>;
}

/// Stores a closed set of names.
///
/// On the entity side a value may be given by name or by ordinal; on the
/// graph side it is always the name.
///
/// ```
/// # use neogm::metadata::{AttributeConverter, EnumConverter};
/// # use neogm::CypherValue;
/// let genre = EnumConverter::new(["DRAMA", "COMEDY"]);
/// assert_eq!(genre.to_graph_property(&CypherValue::Int(1)).unwrap(), CypherValue::from("COMEDY"));
/// assert!(genre.to_entity_attribute(&CypherValue::from("WESTERN")).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct EnumConverter {
    variants: Vec<String>,
    lookup: BTreeSet<String>,
}

impl EnumConverter {
    /// Create a converter accepting the given variant names.
    pub fn new<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        let lookup = variants.iter().cloned().collect();
        Self { variants, lookup }
    }

    /// The accepted variant names, in ordinal order.
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    fn check_name(&self, name: &str) -> Result<CypherValue, ConversionError> {
        if self.lookup.contains(name) {
            Ok(CypherValue::String(name.to_string()))
        } else {
            Err(ConversionError(format!(
                "'{}' is not one of [{}]",
                name,
                self.variants.join(", ")
            )))
        }
    }
}

impl AttributeConverter for EnumConverter {
    fn to_graph_property(&self, value: &CypherValue) -> Result<CypherValue, ConversionError> {
        match value {
            CypherValue::Null => Ok(CypherValue::Null),
            CypherValue::String(name) => self.check_name(name),
            CypherValue::Int(ordinal) => usize::try_from(*ordinal)
                .ok()
                .and_then(|i| self.variants.get(i))
                .map(|name| CypherValue::String(name.clone()))
                .ok_or_else(|| ConversionError(format!("ordinal {} out of range", ordinal))),
            other => Err(ConversionError(format!(
                "expected enum name or ordinal, found {}",
                other.kind()
            ))),
        }
    }

    fn to_entity_attribute(&self, value: &CypherValue) -> Result<CypherValue, ConversionError> {
        match value {
            CypherValue::Null => Ok(CypherValue::Null),
            CypherValue::String(name) => self.check_name(name),
            other => Err(ConversionError(format!(
                "expected enum name, found {}",
                other.kind()
            ))),
        }
    }
}

/// Stores a map or list attribute as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStringConverter;

impl AttributeConverter for JsonStringConverter {
    fn to_graph_property(&self, value: &CypherValue) -> Result<CypherValue, ConversionError> {
        match value {
            CypherValue::Null => Ok(CypherValue::Null),
            other => serde_json::to_string(other)
                .map(CypherValue::String)
                .map_err(|e| ConversionError(e.to_string())),
        }
    }

    fn to_entity_attribute(&self, value: &CypherValue) -> Result<CypherValue, ConversionError> {
        match value {
            CypherValue::Null => Ok(CypherValue::Null),
            CypherValue::String(text) => {
                serde_json::from_str(text).map_err(|e| ConversionError(e.to_string()))
            }
            other => Err(ConversionError(format!(
                "expected JSON text, found {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_enum_converter_names() {
        let conv = EnumConverter::new(["ACTION", "DRAMA"]);
        assert_eq!(
            conv.to_graph_property(&"DRAMA".into()).unwrap(),
            CypherValue::from("DRAMA")
        );
        assert_eq!(
            conv.to_entity_attribute(&"ACTION".into()).unwrap(),
            CypherValue::from("ACTION")
        );
        assert_eq!(conv.variants().len(), 2);
    }

    #[test]
    fn test_enum_converter_rejects() {
        let conv = EnumConverter::new(["ACTION"]);
        assert!(conv.to_graph_property(&CypherValue::Int(3)).is_err());
        assert!(conv.to_graph_property(&CypherValue::Int(-1)).is_err());
        assert!(conv.to_graph_property(&CypherValue::Bool(true)).is_err());
        let err = conv.to_entity_attribute(&"HORROR".into()).unwrap_err();
        assert!(err.to_string().contains("HORROR"));
    }

    #[test]
    fn test_enum_converter_passes_null() {
        let conv = EnumConverter::new(["A"]);
        assert_eq!(conv.to_graph_property(&CypherValue::Null).unwrap(), CypherValue::Null);
    }

    #[test]
    fn test_json_string_converter() {
        let mut map = BTreeMap::new();
        map.insert("city".to_string(), CypherValue::from("Delft"));
        let value = CypherValue::Map(map);

        let stored = JsonStringConverter.to_graph_property(&value).unwrap();
        assert_eq!(stored, CypherValue::from(r#"{"city":"Delft"}"#));
        assert_eq!(JsonStringConverter.to_entity_attribute(&stored).unwrap(), value);
    }

    #[test]
    fn test_json_string_converter_malformed() {
        assert!(JsonStringConverter
            .to_entity_attribute(&CypherValue::from("{broken"))
            .is_err());
        assert!(JsonStringConverter
            .to_entity_attribute(&CypherValue::Int(1))
            .is_err());
    }
}

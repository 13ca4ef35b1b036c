//! Structured field extraction from analysis results.
//!
//! Service fields usually look like `{"type": "string", "valueString": "Acme", "confidence": 0.93}`
//! or the simpler `{"value": "Acme", "confidence": 0.93}`. Both are split into
//! a plain value and a parallel confidence score. Anything else is passed
//! through unchanged and gets no confidence entry.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::analyzer::AnalysisResult;

/// Field values and their confidence scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
    /// Field name to extracted value.
    pub values: Map<String, Value>,
    /// Field name to confidence score, only for fields that carried a value shape.
    pub confidence: Map<String, Value>,
}

impl ExtractedFields {
    /// Returns `true` when no field was extracted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Confidence score of `field`, if it had one.
    pub fn confidence_of(&self, field: &str) -> Option<f64> {
        self.confidence.get(field).and_then(Value::as_f64)
    }
}

/// Typed value keys the service emits alongside `type`.
const TYPED_VALUE_KEYS: [&str; 12] = [
    "valueString",
    "valueNumber",
    "valueInteger",
    "valueDate",
    "valueTime",
    "valueBoolean",
    "valueArray",
    "valueObject",
    "valuePhoneNumber",
    "valueCurrency",
    "valueAddress",
    "valueSelectionMark",
];

/// Returns the value carried by a field object, if it has a value shape.
fn field_value(field: &Map<String, Value>) -> Option<&Value> {
    if let Some(value) = field.get("value") {
        return Some(value);
    }

    TYPED_VALUE_KEYS.iter().find_map(|key| field.get(*key))
}

/// Splits a `fields` mapping into values and confidence scores.
///
/// Confidence defaults to `0.0` when a field has a value but no score.
pub fn split_fields(fields: &Map<String, Value>) -> ExtractedFields {
    let mut extracted = ExtractedFields::default();

    for (name, raw) in fields {
        let shaped = raw.as_object().and_then(|obj| {
            field_value(obj).map(|value| {
                let confidence = obj.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
                (value.clone(), confidence)
            })
        });

        match shaped {
            Some((value, confidence)) => {
                extracted.values.insert(name.clone(), value);
                extracted
                    .confidence
                    .insert(name.clone(), Value::from(confidence));
            }
            None => {
                extracted.values.insert(name.clone(), raw.clone());
            }
        }
    }

    extracted
}

/// Locates the `fields` mapping of the first document in a result payload.
fn first_document_fields(payload: &Value) -> Option<&Map<String, Value>> {
    let documents = ["/documents", "/result/documents", "/analyzeResult/documents"]
        .iter()
        .find_map(|pointer| payload.pointer(pointer).and_then(Value::as_array));

    match documents {
        Some(documents) => documents.first()?.get("fields")?.as_object(),
        None => payload.pointer("/result/contents/0/fields")?.as_object(),
    }
}

/// Extracts the first document's fields from an analysis result.
///
/// A payload without documents or fields yields an empty [`ExtractedFields`].
pub fn extract_document_fields(result: &AnalysisResult) -> ExtractedFields {
    first_document_fields(result.payload())
        .map(split_fields)
        .unwrap_or_default()
}

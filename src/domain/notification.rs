//! Normalisation of Sanity webhook payloads.
//!
//! Sanity emits several payload shapes depending on the webhook projection
//! and the transition: the changed document may be the payload root, or be
//! nested under `document`, and deletions usually only carry `previous`.
//! Everything downstream works on the flat [`ChangeNotification`] instead.

use serde_json::{Map, Value};

use super::error::DomainError;
use super::types::DocumentType;

/// Canonical description of one content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    /// Raw `_type` name; may name a type the site does not handle.
    pub document_type: String,
    pub document_id: Option<String>,
    pub slug: Option<String>,
    /// Slug of the document before the change, when the sender included it.
    pub previous_slug: Option<String>,
}

impl ChangeNotification {
    /// The handled document type, if any.
    pub fn kind(&self) -> Option<DocumentType> {
        DocumentType::from_wire(&self.document_type)
    }

    /// True when the slug changed between the previous and current revision.
    pub fn slug_changed(&self) -> bool {
        matches!(
            (&self.slug, &self.previous_slug),
            (Some(current), Some(previous)) if current != previous
        )
    }
}

/// Return the first candidate that yields a value.
///
/// Candidates are evaluated lazily and in order.
pub fn first_present<'a, T>(
    candidates: impl IntoIterator<Item = Option<&'a Map<String, Value>>>,
    accessor: impl Fn(&'a Map<String, Value>) -> Option<T>,
) -> Option<T> {
    candidates
        .into_iter()
        .flatten()
        .find_map(|document| accessor(document))
}

/// Build a [`ChangeNotification`] from an arbitrary webhook body.
pub fn normalize(payload: &Value) -> Result<ChangeNotification, DomainError> {
    let root = payload.as_object();
    let current = root
        .and_then(|object| object.get("document"))
        .and_then(Value::as_object)
        .or(root);
    let previous = root
        .and_then(|object| object.get("previous"))
        .and_then(Value::as_object);

    let document_type = first_present([current, previous], |doc| string_field(doc, "_type"))
        .ok_or_else(|| DomainError::malformed("Unable to determine document type from payload"))?;

    let slug = first_present([current, root, previous], |doc| {
        doc.get("slug").and_then(extract_slug)
    });
    let previous_slug = first_present([previous], |doc| doc.get("slug").and_then(extract_slug));
    let document_id = first_present([root], |doc| string_field(doc, "documentId"))
        .or_else(|| first_present([current, previous], |doc| string_field(doc, "_id")));

    Ok(ChangeNotification {
        document_type,
        document_id,
        slug,
        previous_slug,
    })
}

/// Read a slug stored either as a plain string or as `{ "current": "..." }`.
pub fn extract_slug(value: &Value) -> Option<String> {
    match value {
        Value::String(slug) => non_empty(slug),
        Value::Object(object) => object
            .get("current")
            .and_then(Value::as_str)
            .and_then(non_empty),
        _ => None,
    }
}

fn string_field(document: &Map<String, Value>, key: &str) -> Option<String> {
    document.get(key).and_then(Value::as_str).and_then(non_empty)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

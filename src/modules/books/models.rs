use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A book record held by the store.
///
/// `year`, `page_count`, `read_page` and `reading` are kept exactly as the
/// caller sent them: `None` when the key was absent, `Some(Value::Null)` for an
/// explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-generated identifier, never changes
    pub id: String,
    pub name: String,
    pub year: Option<Value>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<Value>,
    pub read_page: Option<Value>,
    /// `page_count == read_page` as of the last write
    pub finished: bool,
    pub reading: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub inserted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Book {
    /// Projection returned by the listing endpoint.
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            publisher: self.publisher.clone(),
        }
    }

    /// Overwrite every caller-supplied field and recompute `finished`.
    pub(crate) fn apply(&mut self, name: String, draft: BookDraft, now: OffsetDateTime) {
        self.finished = draft.is_finished();
        self.name = name;
        self.year = draft.year;
        self.author = draft.author;
        self.summary = draft.summary;
        self.publisher = draft.publisher;
        self.page_count = draft.page_count;
        self.read_page = draft.read_page;
        self.reading = draft.reading;
        self.updated_at = now;
    }
}

/// Request body for creating or replacing a book.
///
/// Every field is optional at the wire level; the store decides what is
/// acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub year: Option<Value>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub page_count: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub read_page: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub reading: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing key is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl BookDraft {
    /// Draft carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_pages(mut self, page_count: impl Into<Value>, read_page: impl Into<Value>) -> Self {
        self.page_count = Some(page_count.into());
        self.read_page = Some(read_page.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// `readPage > pageCount` with loose comparison; absent values never exceed.
    pub fn read_page_exceeds_page_count(&self) -> bool {
        match (&self.read_page, &self.page_count) {
            (Some(read), Some(total)) => loose_cmp(read, total) == Some(Ordering::Greater),
            _ => false,
        }
    }

    /// `pageCount === readPage` with strict equality.
    pub fn is_finished(&self) -> bool {
        match (&self.page_count, &self.read_page) {
            (None, None) => true,
            (Some(total), Some(read)) => strict_eq(total, read),
            _ => false,
        }
    }
}

/// Numeric reading of a scalar: `null` is 0, booleans are 0/1, strings are
/// parsed after trimming (blank is 0). Arrays and objects have no number.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Some(0.0)
            } else {
                text.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Two strings compare lexically, anything else numerically. `None` when the
/// values are not comparable.
fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Value::String(l), Value::String(r)) = (left, right) {
        return Some(l.cmp(r));
    }
    to_number(left)?.partial_cmp(&to_number(right)?)
}

/// Same type and same value; `100` equals `100.0`. Arrays and objects never
/// compare equal.
fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        _ => left == right,
    }
}

/// `{id, name, publisher}` view of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub publisher: Option<String>,
}

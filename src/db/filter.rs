//! Typed filter language
//!
//! A small subset of MongoDB query operators. Filters render to a query
//! document for `MongoStore` and are evaluated directly by `MemoryStore`, so
//! both backends agree on one vocabulary.

use std::cmp::Ordering;

use bson::{doc, oid::ObjectId, Bson, Document};

/// Query predicate over a single collection
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    All,
    Eq(String, Bson),
    Ne(String, Bson),
    In(String, Vec<Bson>),
    Lt(String, Bson),
    Gt(String, Bson),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::Exists(field.into(), present)
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// `_id` in the given set
    pub fn ids(ids: &[ObjectId]) -> Self {
        Self::is_in("_id", ids.iter().copied())
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    /// Render as a MongoDB query document
    pub fn to_document(&self) -> Document {
        match self {
            Self::All => Document::new(),
            Self::Eq(field, value) => doc! { field: value.clone() },
            Self::Ne(field, value) => doc! { field: { "$ne": value.clone() } },
            Self::In(field, values) => doc! { field: { "$in": values.clone() } },
            Self::Lt(field, value) => doc! { field: { "$lt": value.clone() } },
            Self::Gt(field, value) => doc! { field: { "$gt": value.clone() } },
            Self::Exists(field, present) => doc! { field: { "$exists": *present } },
            Self::And(filters) => {
                let parts: Vec<Document> = filters.iter().map(Filter::to_document).collect();
                doc! { "$and": parts }
            }
            Self::Or(filters) => {
                let parts: Vec<Document> = filters.iter().map(Filter::to_document).collect();
                doc! { "$or": parts }
            }
        }
    }

    /// Evaluate against a document in process
    ///
    /// Follows MongoDB semantics for missing fields: `$eq: null` and `$ne`
    /// match a missing field, range operators never do.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq(field, value) => field_equals(lookup(document, field), value),
            Self::Ne(field, value) => !field_equals(lookup(document, field), value),
            Self::In(field, values) => {
                let found = lookup(document, field);
                values.iter().any(|v| field_equals(found, v))
            }
            Self::Lt(field, value) => lookup(document, field)
                .and_then(|found| compare(found, value))
                .map(|ord| ord == Ordering::Less)
                .unwrap_or(false),
            Self::Gt(field, value) => lookup(document, field)
                .and_then(|found| compare(found, value))
                .map(|ord| ord == Ordering::Greater)
                .unwrap_or(false),
            Self::Exists(field, present) => lookup(document, field).is_some() == *present,
            Self::And(filters) => filters.iter().all(|f| f.matches(document)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }
}

/// Resolve a dotted path inside a document
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = document.get(first)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn field_equals(found: Option<&Bson>, expected: &Bson) -> bool {
    match (found, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        // Equality against an array field matches any element
        (Some(Bson::Array(items)), value) if !matches!(value, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, value))
        }
        (Some(found), value) => values_equal(found, value),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match compare(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}

/// Order two values of comparable kinds
///
/// Numbers compare across widths; other kinds only compare with themselves.
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;

    #[test]
    fn test_renders_mongo_operators() {
        let filter = Filter::and(vec![
            Filter::eq("is_read", true),
            Filter::or(vec![
                Filter::lt("expires_at", 10_i64),
                Filter::exists("archived_at", false),
            ]),
        ]);
        let rendered = filter.to_document();
        let parts = rendered.get_array("$and").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Bson::Document(doc! { "is_read": true }));
    }

    #[test]
    fn test_missing_field_semantics() {
        let document = doc! { "status": "accepted" };
        assert!(Filter::eq("deleted_at", Bson::Null).matches(&document));
        assert!(Filter::ne("is_hidden", true).matches(&document));
        assert!(!Filter::lt("created_at", DateTime::now()).matches(&document));
        assert!(Filter::exists("created_at", false).matches(&document));
    }

    #[test]
    fn test_numeric_widths_compare() {
        let document = doc! { "posts_count": 0_i64, "score": 2.5 };
        assert!(Filter::eq("posts_count", 0_i32).matches(&document));
        assert!(Filter::gt("score", 2_i32).matches(&document));
    }

    #[test]
    fn test_in_and_array_membership() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let document = doc! { "_id": a, "participants": [a, b] };
        assert!(Filter::ids(&[b, a]).matches(&document));
        assert!(Filter::eq("participants", b).matches(&document));
        assert!(!Filter::ids(&[b]).matches(&document));
    }

    #[test]
    fn test_dotted_lookup() {
        let document = doc! { "venue": { "type": "online", "url": "https://x" } };
        assert!(Filter::eq("venue.type", "online").matches(&document));
        assert!(lookup(&document, "venue.location").is_none());
    }
}

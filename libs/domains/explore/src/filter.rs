//! Pre-filter algebra for nearest-neighbour queries.
//!
//! A [`Filter`] is built once by the suggester and rendered by each vector
//! backend into its native form: a RediSearch query string, a Qdrant
//! `Filter`, or an in-memory predicate.

use qdrant_client::qdrant::{Condition, Filter as QdrantFilter, PointId};
use uuid::Uuid;

/// Tag field holding the plain user id next to each vector
pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every id
    All,
    /// Matches any of the listed ids. An empty list matches nothing.
    Ids(Vec<Uuid>),
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Filter::Ids(ids.into_iter().collect())
    }

    pub fn negate(inner: Filter) -> Self {
        Filter::Not(Box::new(inner))
    }

    /// Exclude `excluded`, and when `candidates` is non-empty, restrict to
    /// them. An empty candidate list leaves the search unrestricted.
    pub fn exclude_then_include(excluded: Vec<Uuid>, candidates: Vec<Uuid>) -> Self {
        let mut parts = vec![Filter::negate(Filter::Ids(excluded))];
        if !candidates.is_empty() {
            parts.push(Filter::Ids(candidates));
        }
        Filter::And(parts)
    }

    pub fn matches(&self, id: &Uuid) -> bool {
        match self {
            Filter::All => true,
            Filter::Ids(ids) => ids.contains(id),
            Filter::Not(inner) => !inner.matches(id),
            Filter::And(parts) => parts.iter().all(|f| f.matches(id)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(id)),
        }
    }

    /// Render as a RediSearch (DIALECT 2) query over the `id` TAG field,
    /// e.g. `(-@id:{a | b} @id:{c | d})`.
    pub fn to_redis_query(&self) -> String {
        match self {
            Filter::All => "*".to_string(),
            Filter::Ids(ids) if ids.is_empty() => format!("@{}:{{__none__}}", ID_FIELD),
            Filter::Ids(ids) => {
                let tags: Vec<String> = ids.iter().map(|id| escape_tag(&id.to_string())).collect();
                format!("@{}:{{{}}}", ID_FIELD, tags.join(" | "))
            }
            Filter::Not(inner) => match inner.as_ref() {
                Filter::All => format!("-{}", Filter::Ids(Vec::new()).to_redis_query()),
                other => format!("-{}", other.to_redis_query()),
            },
            Filter::And(parts) => group(parts, " "),
            Filter::Or(parts) => group(parts, " | "),
        }
    }

    /// Render as a Qdrant filter over point ids. `None` means unrestricted.
    pub fn to_qdrant(&self) -> Option<QdrantFilter> {
        match self {
            Filter::All => None,
            Filter::Ids(ids) => Some(QdrantFilter::must([has_ids(ids)])),
            Filter::Not(inner) => match inner.to_qdrant() {
                Some(f) => Some(QdrantFilter::must_not([Condition::from(f)])),
                None => Some(QdrantFilter::must([has_ids(&[])])),
            },
            Filter::And(parts) => {
                let conditions: Vec<Condition> = parts
                    .iter()
                    .filter_map(Filter::to_qdrant)
                    .map(Condition::from)
                    .collect();
                if conditions.is_empty() {
                    None
                } else {
                    Some(QdrantFilter::must(conditions))
                }
            }
            Filter::Or(parts) => {
                let mut conditions = Vec::with_capacity(parts.len());
                for part in parts {
                    // One unrestricted branch makes the whole disjunction unrestricted
                    conditions.push(Condition::from(part.to_qdrant()?));
                }
                Some(QdrantFilter::should(conditions))
            }
        }
    }
}

fn has_ids(ids: &[Uuid]) -> Condition {
    Condition::has_id(ids.iter().map(|id| PointId::from(id.to_string())))
}

fn group(parts: &[Filter], separator: &str) -> String {
    let rendered: Vec<String> = parts
        .iter()
        .filter(|p| **p != Filter::All)
        .map(Filter::to_redis_query)
        .collect();

    match rendered.len() {
        0 => "*".to_string(),
        _ => format!("({})", rendered.join(separator)),
    }
}

/// Escape TAG punctuation. UUIDs only need their hyphens escaped, but the
/// full set is handled so arbitrary tags stay safe.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

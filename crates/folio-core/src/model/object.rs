use serde::{Deserialize, Serialize};

/// Object - the owner of a block document
///
/// Objects are created and edited by an external object service. The block
/// engine only reads them and bumps `doc_version` once per applied patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// Unique identifier (ULID)
    pub id: String,

    /// Type of the object, owned by the type service
    pub type_id: String,

    /// Human-readable title; drives unlinked-mention search
    pub title: String,

    /// Type-specific properties
    pub properties: serde_json::Value,

    /// Optimistic concurrency counter, starts at 0
    pub doc_version: u64,

    /// Creation time, milliseconds since epoch
    pub created_at: i64,

    /// Last update time, milliseconds since epoch
    pub updated_at: i64,

    /// Soft-delete time, milliseconds since epoch
    pub deleted_at: Option<i64>,
}

impl Object {
    /// Create a live object at version 0
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            type_id: type_id.into(),
            title: title.into(),
            properties: serde_json::json!({}),
            doc_version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the title can be searched for as a mention
    pub fn has_searchable_title(&self) -> bool {
        self.title.chars().any(char::is_alphanumeric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_object() {
        let object = Object::new("o1", "page", "Roadmap");
        assert_eq!(object.doc_version, 0);
        assert!(!object.is_deleted());
        assert!(object.has_searchable_title());
    }

    #[test]
    fn test_punctuation_title_is_not_searchable() {
        assert!(!Object::new("o1", "page", "   ").has_searchable_title());
        assert!(!Object::new("o1", "page", "\"--\"").has_searchable_title());
    }
}

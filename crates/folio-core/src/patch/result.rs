use serde::{Deserialize, Serialize};

/// Warning code for a reference whose target is missing or soft-deleted
pub const REF_TARGET_MISSING: &str = "REF_TARGET_MISSING";

/// Ids touched by a patch, one list per op kind
///
/// Each id appears at most once per list, in first-touched order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOps {
    pub inserted_block_ids: Vec<String>,
    pub updated_block_ids: Vec<String>,
    pub moved_block_ids: Vec<String>,
    pub deleted_block_ids: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

impl AppliedOps {
    pub fn record_inserted(&mut self, id: &str) {
        push_unique(&mut self.inserted_block_ids, id);
    }

    pub fn record_updated(&mut self, id: &str) {
        push_unique(&mut self.updated_block_ids, id);
    }

    pub fn record_moved(&mut self, id: &str) {
        push_unique(&mut self.moved_block_ids, id);
    }

    pub fn record_deleted(&mut self, id: &str) {
        push_unique(&mut self.deleted_block_ids, id);
    }
}

/// Non-fatal condition found while applying a patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchWarning {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PatchWarning {
    /// A reference in `block_id` points at an object or block that is not live
    pub fn ref_target_missing(
        block_id: &str,
        target_object_id: &str,
        target_block_id: Option<&str>,
    ) -> Self {
        let mut details = serde_json::json!({
            "blockId": block_id,
            "targetObjectId": target_object_id,
        });
        let message = match target_block_id {
            Some(target_block_id) => {
                details["targetBlockId"] = target_block_id.into();
                format!(
                    "block {} references missing block {} of object {}",
                    block_id, target_block_id, target_object_id
                )
            }
            None => format!(
                "block {} references missing object {}",
                block_id, target_object_id
            ),
        };
        Self {
            code: REF_TARGET_MISSING.to_string(),
            message,
            details: Some(details),
        }
    }
}

/// Response envelope of `apply_block_patch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResult {
    pub api_version: String,
    pub object_id: String,
    pub previous_doc_version: u64,
    pub new_doc_version: u64,
    pub applied: AppliedOps,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PatchWarning>,
}

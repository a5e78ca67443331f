use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{BlockMeta, BlockType};

/// Where a block lands among its new siblings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "where", rename_all = "snake_case")]
pub enum Place {
    Start,
    End,
    Before {
        #[serde(rename = "siblingBlockId")]
        sibling_block_id: String,
    },
    After {
        #[serde(rename = "siblingBlockId")]
        sibling_block_id: String,
    },
}

impl Place {
    pub fn sibling_block_id(&self) -> Option<&str> {
        match self {
            Place::Start | Place::End => None,
            Place::Before { sibling_block_id } | Place::After { sibling_block_id } => {
                Some(sibling_block_id)
            }
        }
    }
}

/// Partial update of a block
///
/// `meta` distinguishes "absent" (`None`) from an explicit JSON `null`
/// (`Some(None)`), which clears the stored meta.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub meta: Option<Option<BlockMeta>>,
}

impl BlockPatch {
    pub fn is_empty(&self) -> bool {
        self.block_type.is_none() && self.content.is_none() && self.meta.is_none()
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One operation of a patch batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum BlockOp {
    #[serde(rename = "block.insert", rename_all = "camelCase")]
    Insert {
        block_id: String,
        parent_block_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        place: Option<Place>,
        block_type: BlockType,
        content: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<BlockMeta>,
    },
    #[serde(rename = "block.update", rename_all = "camelCase")]
    Update { block_id: String, patch: BlockPatch },
    #[serde(rename = "block.move", rename_all = "camelCase")]
    Move {
        block_id: String,
        new_parent_block_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        place: Option<Place>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtree: Option<bool>,
    },
    #[serde(rename = "block.delete", rename_all = "camelCase")]
    Delete {
        block_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtree: Option<bool>,
    },
}

impl BlockOp {
    /// Wire name of the op, also used as the error `op` context
    pub fn name(&self) -> &'static str {
        match self {
            BlockOp::Insert { .. } => "block.insert",
            BlockOp::Update { .. } => "block.update",
            BlockOp::Move { .. } => "block.move",
            BlockOp::Delete { .. } => "block.delete",
        }
    }

    /// The block this op targets
    pub fn block_id(&self) -> &str {
        match self {
            BlockOp::Insert { block_id, .. }
            | BlockOp::Update { block_id, .. }
            | BlockOp::Move { block_id, .. }
            | BlockOp::Delete { block_id, .. } => block_id,
        }
    }
}

/// Informational client metadata; never interpreted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

/// Request envelope of `apply_block_patch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRequest {
    pub api_version: String,
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_doc_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub ops: Vec<BlockOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientInfo>,
}

impl PatchRequest {
    /// A `v1` request without version check or idempotency key
    pub fn new(object_id: impl Into<String>, ops: Vec<BlockOp>) -> Self {
        Self {
            api_version: crate::rules::API_VERSION.to_string(),
            object_id: object_id.into(),
            base_doc_version: None,
            idempotency_key: None,
            ops,
            client: None,
        }
    }

    pub fn with_base_doc_version(mut self, version: u64) -> Self {
        self.base_doc_version = Some(version);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_op_wire_format() {
        let op: BlockOp = serde_json::from_value(json!({
            "op": "block.insert",
            "blockId": "b1",
            "parentBlockId": null,
            "place": {"where": "after", "siblingBlockId": "b0"},
            "blockType": "paragraph",
            "content": {"inline": []}
        }))
        .unwrap();

        match &op {
            BlockOp::Insert {
                parent_block_id,
                place,
                block_type,
                ..
            } => {
                assert!(parent_block_id.is_none());
                assert_eq!(
                    place,
                    &Some(Place::After {
                        sibling_block_id: "b0".to_string()
                    })
                );
                assert_eq!(*block_type, BlockType::Paragraph);
            }
            other => panic!("unexpected op {:?}", other),
        }
        assert_eq!(op.name(), "block.insert");
        assert_eq!(op.block_id(), "b1");
    }

    #[test]
    fn test_update_meta_null_differs_from_absent() {
        let cleared: BlockOp = serde_json::from_value(json!({
            "op": "block.update",
            "blockId": "b1",
            "patch": {"meta": null}
        }))
        .unwrap();
        let absent: BlockOp = serde_json::from_value(json!({
            "op": "block.update",
            "blockId": "b1",
            "patch": {"content": {"inline": []}}
        }))
        .unwrap();

        match (cleared, absent) {
            (BlockOp::Update { patch: p1, .. }, BlockOp::Update { patch: p2, .. }) => {
                assert_eq!(p1.meta, Some(None));
                assert!(!p1.is_empty());
                assert_eq!(p2.meta, None);
            }
            _ => panic!("expected updates"),
        }
    }

    #[test]
    fn test_unknown_op_rejected() {
        let value = json!({"op": "block.split", "blockId": "b1"});
        assert!(serde_json::from_value::<BlockOp>(value).is_err());
    }

    #[test]
    fn test_request_envelope() {
        let request: PatchRequest = serde_json::from_value(json!({
            "apiVersion": "v1",
            "objectId": "o1",
            "baseDocVersion": 3,
            "idempotencyKey": "k1",
            "ops": [{"op": "block.delete", "blockId": "b1", "subtree": true}],
            "client": {"actorId": "u1", "ts": 1700000000000i64}
        }))
        .unwrap();

        assert_eq!(request.base_doc_version, Some(3));
        assert_eq!(request.idempotency_key.as_deref(), Some("k1"));
        assert_eq!(request.client.unwrap().actor_id.as_deref(), Some("u1"));
        assert_eq!(
            request.ops,
            vec![BlockOp::Delete {
                block_id: "b1".to_string(),
                subtree: Some(true)
            }]
        );
    }
}

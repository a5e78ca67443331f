//! Read-only queries over the block tree and its derived indexes.
//!
//! Queries take a shared connection and never write.

pub mod backlinks;
pub mod document;
pub mod mentions;

use folio_core::errors::FolioError;
use folio_core::model::Object;
use folio_store::errors::Result;
use folio_store::repo::ObjectRepo;
use rusqlite::Connection;

/// Load an object, live or deleted; unknown ids are `NOT_FOUND_OBJECT`
fn load_object(conn: &Connection, object_id: &str) -> Result<Object> {
    ObjectRepo::get_object(conn, object_id)?.ok_or_else(|| {
        FolioError::ObjectNotFound {
            object_id: object_id.to_string(),
        }
        .into()
    })
}

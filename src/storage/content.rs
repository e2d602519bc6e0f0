use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{ContentRecord, ContentType};
use super::tables::*;

impl Database {
    // ========================================================================
    // Content operations
    // ========================================================================

    /// Store a content record and append it to its owner's index
    pub fn insert_content(&self, content: &ContentRecord) -> Result<(), DatabaseError> {
        debug_assert!(!content.id.is_empty(), "content id must not be empty");
        debug_assert!(
            !content.uploaded_by.is_empty(),
            "content owner must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(CONTENT)?;
            let data = rmp_serde::to_vec_named(content)?;
            table.insert(content.id.as_str(), data.as_slice())?;

            let mut owner_table = write_txn.open_table(OWNER_CONTENT)?;
            let mut content_ids: Vec<String> = match owner_table.get(content.uploaded_by.as_str())?
            {
                Some(v) => rmp_serde::from_slice(v.value())?,
                None => Vec::new(),
            };

            if !content_ids.contains(&content.id) {
                content_ids.push(content.id.clone());
                let index_data = rmp_serde::to_vec_named(&content_ids)?;
                owner_table.insert(content.uploaded_by.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a content record by its UUID
    pub fn get_content(&self, id: &str) -> Result<Option<ContentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CONTENT)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All content uploaded by one user, in upload order
    pub fn list_content_by_owner(&self, owner_id: &str) -> Result<Vec<ContentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_CONTENT)?;
        let content_table = read_txn.open_table(CONTENT)?;

        let content_ids: Vec<String> = match owner_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut items = Vec::with_capacity(content_ids.len());
        for content_id in content_ids {
            if let Some(data) = content_table.get(content_id.as_str())? {
                let content: ContentRecord = rmp_serde::from_slice(data.value())?;
                items.push(content);
            }
        }

        Ok(items)
    }

    /// All content in the system, oldest first, optionally narrowed to one type
    pub fn list_all_content(
        &self,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ContentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CONTENT)?;

        let mut items = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let content: ContentRecord = rmp_serde::from_slice(value.value())?;
            if content_type.map_or(true, |t| t == content.content_type) {
                items.push(content);
            }
        }

        // Keys are random UUIDs, so table order says nothing about upload order
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}

use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::NoteRecord;
use super::tables::*;

impl Database {
    /// Get the note belonging to a user
    pub fn get_note(&self, user_id: &str) -> Result<Option<NoteRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(NOTES)?;

        match table.get(user_id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Create or replace a user's note, keeping the original creation time
    pub fn upsert_note(
        &self,
        user_id: &str,
        username: &str,
        content: &str,
    ) -> Result<NoteRecord, DatabaseError> {
        let write_txn = self.begin_write()?;
        let now = Utc::now();

        let note = {
            let mut table = write_txn.open_table(NOTES)?;
            let existing: Option<NoteRecord> = match table.get(user_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            let note = NoteRecord {
                user_id: user_id.to_string(),
                username: username.to_string(),
                content: content.to_string(),
                created_at: existing.map(|n| n.created_at).unwrap_or(now),
                updated_at: now,
            };

            let data = rmp_serde::to_vec_named(&note)?;
            table.insert(user_id, data.as_slice())?;
            note
        };

        write_txn.commit()?;
        Ok(note)
    }

    /// Delete a user's note. Returns whether one existed.
    pub fn delete_note(&self, user_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(NOTES)?;
            let removed = table.remove(user_id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::ResetTokenRecord;
use super::tables::*;

impl Database {
    /// Record a pending password reset under the digest of its token.
    ///
    /// A user holds at most one live token: issuing a new one revokes the
    /// previous one. Expired rows of any user are dropped in the same
    /// transaction, so the table only holds live tokens.
    pub fn put_reset_token(
        &self,
        digest: &str,
        record: &ResetTokenRecord,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let write_txn = self.begin_write()?;
        {
            let mut tokens = write_txn.open_table(RESET_TOKENS)?;
            let mut by_user = write_txn.open_table(USER_RESET_TOKENS)?;

            // Expired tokens, with the user they belonged to
            let mut expired: Vec<(String, String)> = Vec::new();
            for result in tokens.iter()? {
                let (key, value) = result?;
                let pending: ResetTokenRecord = rmp_serde::from_slice(value.value())?;
                if is_expired(&pending, now) {
                    expired.push((key.value().to_string(), pending.user_id));
                }
            }
            for (expired_digest, user_id) in &expired {
                tokens.remove(expired_digest.as_str())?;
                let points_here = match by_user.get(user_id.as_str())? {
                    Some(current) => current.value() == expired_digest.as_str(),
                    None => false,
                };
                if points_here {
                    by_user.remove(user_id.as_str())?;
                }
            }

            let previous = by_user
                .insert(record.user_id.as_str(), digest)?
                .map(|old| old.value().to_string());
            if let Some(previous) = previous {
                tokens.remove(previous.as_str())?;
            }

            let data = rmp_serde::to_vec_named(record)?;
            tokens.insert(digest, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove and return a pending reset. A token can be taken at most once,
    /// and taking it clears the owner's pending reset entirely.
    pub fn take_reset_token(&self, digest: &str) -> Result<Option<ResetTokenRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let record: Option<ResetTokenRecord> = {
            let mut tokens = write_txn.open_table(RESET_TOKENS)?;
            let removed = match tokens.remove(digest)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            removed
        };
        if let Some(ref record) = record {
            clear_user_reset(&write_txn, &record.user_id)?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    /// Number of stored reset tokens, live or not yet pruned.
    pub fn reset_token_count(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RESET_TOKENS)?;

        let mut count = 0;
        for result in table.iter()? {
            result?;
            count += 1;
        }
        Ok(count)
    }
}

/// Drop the user's index entry and the token it points at.
fn clear_user_reset(write_txn: &WriteTransaction, user_id: &str) -> Result<(), DatabaseError> {
    let mut by_user = write_txn.open_table(USER_RESET_TOKENS)?;
    let current = by_user.remove(user_id)?.map(|d| d.value().to_string());
    if let Some(current) = current {
        let mut tokens = write_txn.open_table(RESET_TOKENS)?;
        tokens.remove(current.as_str())?;
    }
    Ok(())
}

fn is_expired(record: &ResetTokenRecord, now: DateTime<Utc>) -> bool {
    record.expires_at <= now
}

use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::UserRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a new user and claim its email in the same transaction.
    ///
    /// Returns `false` (and writes nothing) when the email is already registered.
    pub fn insert_user(&self, user: &UserRecord) -> Result<bool, DatabaseError> {
        debug_assert!(!user.id.is_empty(), "user id must not be empty");
        debug_assert!(!user.email.is_empty(), "user email must not be empty");

        let write_txn = self.begin_write()?;
        let taken = {
            let emails = write_txn.open_table(USER_EMAILS)?;
            let taken = emails.get(user.email.as_str())?.is_some();
            taken
        };

        if taken {
            write_txn.abort()?;
            return Ok(false);
        }

        {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.insert(user.email.as_str(), user.id.as_str())?;

            let mut users = write_txn.open_table(USERS)?;
            let data = rmp_serde::to_vec_named(user)?;
            users.insert(user.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    /// Get a user by its UUID
    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a user by normalized email (resolves email -> uuid -> user)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;

        let id = match emails.get(email)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Replace a user's password hash. Returns `false` if the user does not exist.
    pub fn update_user_password(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<UserRecord> = {
            let table = write_txn.open_table(USERS)?;
            let result = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = chrono::Utc::now();

                let data = rmp_serde::to_vec_named(&user)?;
                let mut table = write_txn.open_table(USERS)?;
                table.insert(id, data.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }
}

use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{ProfileRecord, ProfileUpdate};
use super::tables::*;

impl Database {
    /// Get a user's profile
    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;

        match table.get(user_id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Store `profile` unless the user already has one; returns the stored profile.
    pub fn get_or_insert_profile(
        &self,
        profile: &ProfileRecord,
    ) -> Result<ProfileRecord, DatabaseError> {
        let write_txn = self.begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(PROFILES)?;
            let existing: Option<ProfileRecord> = match table.get(profile.user_id.as_str())? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing {
                Some(existing) => existing,
                None => {
                    let data = rmp_serde::to_vec_named(profile)?;
                    table.insert(profile.user_id.as_str(), data.as_slice())?;
                    profile.clone()
                }
            }
        };
        write_txn.commit()?;
        Ok(stored)
    }

    /// Apply a partial update. Returns `None` if the user has no profile yet.
    pub fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<ProfileRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<ProfileRecord> = {
            let table = write_txn.open_table(PROFILES)?;
            let result = match table.get(user_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut profile) => {
                if let Some(ref name) = update.name {
                    profile.name = name.clone();
                }
                if let Some(ref email) = update.email {
                    profile.email = email.clone();
                }
                if let Some(ref phone) = update.phone {
                    profile.phone = phone.clone();
                }
                if let Some(ref study) = update.study {
                    profile.study = study.clone();
                }
                if let Some(ref about) = update.about {
                    profile.about = about.clone();
                }
                profile.updated_at = chrono::Utc::now();

                let data = rmp_serde::to_vec_named(&profile)?;
                let mut table = write_txn.open_table(PROFILES)?;
                table.insert(user_id, data.as_slice())?;
                Some(profile)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }
}

use redb::TableDefinition;

/// User records: uuid -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: normalized email -> user uuid
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Content records: uuid -> ContentRecord (msgpack)
pub const CONTENT: TableDefinition<&str, &[u8]> = TableDefinition::new("content");

/// Owner index: user uuid -> msgpack Vec of content UUIDs, in upload order
pub const OWNER_CONTENT: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_content");

/// Notes: user uuid -> NoteRecord (msgpack)
pub const NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("notes");

/// Profiles: user uuid -> ProfileRecord (msgpack)
pub const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Password reset tokens: base64 SHA-256 digest -> ResetTokenRecord (msgpack)
pub const RESET_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("reset_tokens");

/// Pending reset per user: user uuid -> digest of that user's only live token
pub const USER_RESET_TOKENS: TableDefinition<&str, &str> = TableDefinition::new("user_reset_tokens");

// Keychain entries get app-side UUIDv7 keys so listings sort by creation
// time. Refresh-token JTIs stay random v4.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// PostgreSQL does not natively support UUIDv7 for auto-generation.
// api_keys rows are listed newest-first, so their ids are generated
// app-side as UUIDv7 and double as a creation-order tie-breaker.
// users ids stay v4 (ordering is irrelevant there).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

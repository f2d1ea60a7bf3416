use uuid::Uuid;

/// Room id no other test will pick, so tests sharing a store stay isolated.
pub fn unique_room_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::{debug, warn};

use super::{decode, encode, room_key, RoomStore};
use crate::domain::GameRoom;
use crate::error::AppError;

// Stored snapshots without a version field count as version 0.
static COMPARE_AND_SET: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
local current = redis.call('GET', KEYS[1])
local expected = tonumber(ARGV[1])
if current then
    local stored = cjson.decode(current)['version'] or 0
    if stored ~= expected then
        return 0
    end
elseif expected ~= 0 then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#,
    )
});

/// Room snapshots as JSON strings under `game:{room_id}`.
#[derive(Clone)]
pub struct RedisRoomStore {
    manager: ConnectionManager,
}

impl RedisRoomStore {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;

        let manager = ConnectionManager::new(client).await.map_err(|err| {
            AppError::store_unavailable("Unable to initialize Redis connection manager", err)
        })?;

        Ok(Self { manager })
    }
}

#[async_trait]
impl RoomStore for RedisRoomStore {
    async fn load(&self, room_id: &str) -> Result<Option<GameRoom>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(room_key(room_id)).await?;
        let Some(raw) = raw else {
            debug!(room_id, "No stored snapshot");
            return Ok(None);
        };
        decode(&raw).map(Some)
    }

    async fn save(&self, room: &GameRoom) -> Result<(), AppError> {
        // Encode before touching Redis so a bad snapshot never reaches the store.
        let payload = encode(room)?;
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(room_key(room.id()), payload).await?;
        Ok(())
    }

    async fn compare_and_save(
        &self,
        room: &GameRoom,
        expected_version: u64,
    ) -> Result<bool, AppError> {
        let payload = encode(room)?;
        let mut conn = self.manager.clone();
        let written: i64 = COMPARE_AND_SET
            .key(room_key(room.id()))
            .arg(expected_version)
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;
        if written == 0 {
            warn!(
                room_id = room.id(),
                expected_version, "Snapshot version moved, write rejected"
            );
        }
        Ok(written == 1)
    }

    async fn delete(&self, room_id: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(room_key(room_id)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await?;
        Ok(())
    }
}

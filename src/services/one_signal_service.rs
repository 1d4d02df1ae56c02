use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::OneSignal;
use crate::database::repository::Repository;

/// Device registrations, one per (user, imei)
pub struct OneSignalService {
    registrations: Repository<OneSignal>,
}

impl OneSignalService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            registrations: Repository::new(pool),
        }
    }

    pub async fn upsert(&self, user_id: i64, imei: &str, player_id: &str) -> Result<OneSignal, DatabaseError> {
        let registration = sqlx::query_as::<_, OneSignal>(
            r#"
            INSERT INTO one_signals (user_id, imei, player_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, imei) DO UPDATE
                SET player_id = EXCLUDED.player_id, updated_at = now()
            RETURNING id, user_id, imei, player_id, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(imei)
        .bind(player_id)
        .fetch_one(self.registrations.pool())
        .await?;
        Ok(registration)
    }

    /// Forgets the device; unknown devices are ignored
    pub async fn remove(&self, user_id: i64, imei: &str) -> Result<bool, DatabaseError> {
        let removed = sqlx::query("DELETE FROM one_signals WHERE user_id = $1 AND imei = $2")
            .bind(user_id)
            .bind(imei)
            .execute(self.registrations.pool())
            .await?
            .rows_affected();
        Ok(removed > 0)
    }
}

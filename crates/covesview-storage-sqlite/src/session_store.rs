use async_trait::async_trait;
use sqlx::Row;

use covesview_core::traits::SessionStore;
use covesview_core::types::OAuthSession;
use covesview_core::{AppError, AppResult};

use crate::mapping::{format_datetime, parse_datetime};
use crate::store::SqliteStore;

fn storage_err(e: sqlx::Error) -> AppError {
    AppError::Storage(e.to_string())
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> AppResult<OAuthSession> {
    Ok(OAuthSession {
        session_id: row.try_get("session_id").map_err(storage_err)?,
        account_did: row.try_get("account_did").map_err(storage_err)?,
        handle: row.try_get("handle").map_err(storage_err)?,
        access_token: row.try_get("access_token").map_err(storage_err)?,
        dpop_jkt: row.try_get("dpop_jkt").map_err(storage_err)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(storage_err)?)?,
        expires_at: parse_datetime(&row.try_get::<String, _>("expires_at").map_err(storage_err)?)?,
    })
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, session: &OAuthSession) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO oauth_sessions
                (session_id, account_did, handle, access_token, dpop_jkt, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(&session.account_did)
        .bind(&session.handle)
        .bind(&session.access_token)
        .bind(&session.dpop_jkt)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> AppResult<Option<OAuthSession>> {
        let row = sqlx::query("SELECT * FROM oauth_sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn delete_session(&self, session_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM oauth_sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_sessions_for_did(&self, did: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM oauth_sessions WHERE account_did = ?")
            .bind(did)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected())
    }

    async fn update_handle_for_sessions(&self, did: &str, new_handle: &str) -> AppResult<()> {
        sqlx::query("UPDATE oauth_sessions SET handle = ? WHERE account_did = ?")
            .bind(new_handle)
            .bind(did)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

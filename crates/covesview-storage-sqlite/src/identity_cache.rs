use async_trait::async_trait;
use sqlx::Row;

use covesview_core::traits::IdentityCacheStore;
use covesview_core::types::{Identity, ResolutionMethod};
use covesview_core::{AppError, AppResult};

use crate::mapping::{format_datetime, parse_datetime};
use crate::store::SqliteStore;

fn storage_err(e: sqlx::Error) -> AppError {
    AppError::Storage(e.to_string())
}

fn method_str(method: ResolutionMethod) -> &'static str {
    match method {
        ResolutionMethod::Dns => "dns",
        ResolutionMethod::Https => "https",
        ResolutionMethod::Cache => "cache",
    }
}

fn parse_method(s: &str) -> ResolutionMethod {
    match s {
        "dns" => ResolutionMethod::Dns,
        _ => ResolutionMethod::Https,
    }
}

#[async_trait]
impl IdentityCacheStore for SqliteStore {
    async fn get(&self, key: &str) -> AppResult<Option<Identity>> {
        let row = sqlx::query("SELECT * FROM identity_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(Identity {
            did: row.try_get("did").map_err(storage_err)?,
            handle: row.try_get("handle").map_err(storage_err)?,
            data_server: row.try_get("data_server").map_err(storage_err)?,
            resolved_at: parse_datetime(&row.try_get::<String, _>("resolved_at").map_err(storage_err)?)?,
            method: parse_method(&row.try_get::<String, _>("method").map_err(storage_err)?),
        }))
    }

    async fn put(&self, key: &str, identity: &Identity) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO identity_cache (key, did, handle, data_server, method, resolved_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                did = excluded.did,
                handle = excluded.handle,
                data_server = excluded.data_server,
                method = excluded.method,
                resolved_at = excluded.resolved_at",
        )
        .bind(key)
        .bind(&identity.did)
        .bind(&identity.handle)
        .bind(&identity.data_server)
        .bind(method_str(identity.method))
        .bind(format_datetime(&identity.resolved_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM identity_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

use std::time::SystemTime;

use crate::error::{ImageProxyError, ImageProxyResult};

/// Scans the cache directory and deletes least-recently-used entries (by
/// mtime, bumped on every [`crate::cache::FsImageCache::get`] hit) until the
/// total size is at or below `max_bytes`.
pub async fn evict_to_fit(cache_dir: &std::path::Path, max_bytes: u64) -> ImageProxyResult<usize> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(cache_dir)
        .await
        .map_err(|e| ImageProxyError::Cache(e.to_string()))?;

    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| ImageProxyError::Cache(e.to_string()))?
    {
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push((entry.path(), metadata.len(), modified));
    }

    let total: u64 = entries.iter().map(|(_, len, _)| len).sum();
    if total <= max_bytes {
        return Ok(0);
    }

    entries.sort_by_key(|(_, _, modified)| *modified);

    let mut remaining = total;
    let mut evicted = 0;
    for (path, len, _) in entries {
        if remaining <= max_bytes {
            break;
        }
        if tokio::fs::remove_file(&path).await.is_ok() {
            remaining -= len;
            evicted += 1;
        }
    }
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn write_aged(dir: &std::path::Path, name: &str, bytes: &[u8], age: Duration) {
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await.unwrap();
        let older = SystemTime::now() - age;
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(older).unwrap();
    }

    #[tokio::test]
    async fn evicts_oldest_entries_first_until_under_budget() {
        let dir = tempfile::tempdir().unwrap();
        write_aged(dir.path(), "avatar-old.jpg", &[0u8; 100], Duration::from_secs(600)).await;
        write_aged(dir.path(), "avatar-newer.jpg", &[0u8; 100], Duration::from_secs(60)).await;
        write_aged(dir.path(), "avatar-newest.jpg", &[0u8; 100], Duration::from_secs(1)).await;

        let evicted = evict_to_fit(dir.path(), 150).await.unwrap();
        assert_eq!(evicted, 2);
        assert!(!dir.path().join("avatar-old.jpg").exists());
        assert!(!dir.path().join("avatar-newer.jpg").exists());
        assert!(dir.path().join("avatar-newest.jpg").exists());
    }

    #[tokio::test]
    async fn no_eviction_when_already_under_budget() {
        let dir = tempfile::tempdir().unwrap();
        write_aged(dir.path(), "avatar-a.jpg", &[0u8; 10], Duration::from_secs(5)).await;
        let evicted = evict_to_fit(dir.path(), 1000).await.unwrap();
        assert_eq!(evicted, 0);
        assert!(dir.path().join("avatar-a.jpg").exists());
    }
}

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{ImageProxyError, ImageProxyResult};

/// On-disk cache of transformed images, keyed by `(preset, cid)`. Each hit
/// touches the file's mtime so [`crate::eviction`] can evict the
/// least-recently-*used* entries rather than the least-recently-*written*
/// ones.
#[derive(Clone)]
pub struct FsImageCache {
    base_path: PathBuf,
}

impl FsImageCache {
    pub fn new(path: impl Into<PathBuf>) -> ImageProxyResult<Self> {
        let base_path = path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| ImageProxyError::Cache(e.to_string()))?;
        Ok(Self { base_path })
    }

    fn entry_path(&self, preset: &str, cid: &str) -> PathBuf {
        self.base_path.join(format!("{preset}-{cid}.jpg"))
    }

    pub async fn get(&self, preset: &str, cid: &str) -> ImageProxyResult<Option<Vec<u8>>> {
        let path = self.entry_path(preset, cid);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                touch(&path);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ImageProxyError::Cache(e.to_string())),
        }
    }

    pub async fn put(&self, preset: &str, cid: &str, bytes: &[u8]) -> ImageProxyResult<()> {
        let path = self.entry_path(preset, cid);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ImageProxyError::Cache(e.to_string()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

pub fn etag_for(preset: &str, cid: &str) -> String {
    format!("\"{preset}-{cid}\"")
}

fn touch(path: &Path) {
    if let Ok(file) = std::fs::OpenOptions::new().write(true).open(path) {
        let _ = file.set_modified(SystemTime::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_put_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsImageCache::new(dir.path()).unwrap();
        assert!(cache.get("avatar", "bafyabc").await.unwrap().is_none());
        cache.put("avatar", "bafyabc", b"jpeg-bytes").await.unwrap();
        assert_eq!(cache.get("avatar", "bafyabc").await.unwrap().unwrap(), b"jpeg-bytes");
    }

    #[test]
    fn etag_format_embeds_preset_and_cid() {
        assert_eq!(etag_for("avatar", "bafyabc"), "\"avatar-bafyabc\"");
    }
}

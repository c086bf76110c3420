use std::path::Path;

use crate::errors::ScanError;

/// Atomic file write: write to temp, then rename
pub async fn atomic_write(path: &Path, content: impl AsRef<[u8]>) -> Result<(), ScanError> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content.as_ref()).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        atomic_write(&path, "{\"v\":1}").await.unwrap();
        atomic_write(&path, "{\"v\":2}").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{\"v\":2}");
        assert!(!dir.path().join("session.tmp").exists());
    }
}

//! Removal of the destination root.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use crate::error::StageError;

/// Recursively remove `dest`. A missing directory is not an error.
pub async fn clean(dest: &Path) -> Result<(), StageError> {
    match fs::remove_dir_all(dest).await {
        Ok(()) => {
            tracing::info!("Removed {}", dest.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("{} does not exist, nothing to clean", dest.display());
            Ok(())
        }
        Err(e) => Err(StageError::io(dest, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn removes_nested_output() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("build");
        std::fs::create_dir_all(dest.join("assets/js")).unwrap();
        std::fs::write(dest.join("assets/js/main.js"), "x").unwrap();

        clean(&dest).await.unwrap();

        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn is_idempotent() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("build");

        clean(&dest).await.unwrap();
        clean(&dest).await.unwrap();
    }
}

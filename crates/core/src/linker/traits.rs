//! Link operation capability: the single seam behind which platform
//! linking mechanics live.

use async_trait::async_trait;
use std::path::Path;

use super::error::LinkError;

/// Creates and removes symbolic links.
#[async_trait]
pub trait LinkOps: Send + Sync {
    /// Create a symbolic link at `link` pointing at `target`. `directory`
    /// distinguishes directory links on platforms that care.
    async fn create_link(
        &self,
        target: &Path,
        link: &Path,
        directory: bool,
    ) -> Result<(), LinkError>;

    /// Remove the symbolic link at `link`. Fails with
    /// [`LinkError::NotASymlink`] when the entry is anything else, as a
    /// safety check against deleting real data.
    async fn remove_link(&self, link: &Path) -> Result<(), LinkError>;
}

/// Native symlink implementation.
pub struct NativeLinkOps;

#[async_trait]
impl LinkOps for NativeLinkOps {
    #[cfg(unix)]
    async fn create_link(
        &self,
        target: &Path,
        link: &Path,
        _directory: bool,
    ) -> Result<(), LinkError> {
        tokio::fs::symlink(target, link)
            .await
            .map_err(|e| LinkError::CreateFailed {
                path: link.to_path_buf(),
                source: e,
            })
    }

    #[cfg(windows)]
    async fn create_link(
        &self,
        target: &Path,
        link: &Path,
        directory: bool,
    ) -> Result<(), LinkError> {
        let result = if directory {
            tokio::fs::symlink_dir(target, link).await
        } else {
            tokio::fs::symlink_file(target, link).await
        };
        result.map_err(|e| LinkError::CreateFailed {
            path: link.to_path_buf(),
            source: e,
        })
    }

    async fn remove_link(&self, link: &Path) -> Result<(), LinkError> {
        let metadata = tokio::fs::symlink_metadata(link)
            .await
            .map_err(|e| LinkError::RemoveFailed {
                path: link.to_path_buf(),
                source: e,
            })?;
        if !metadata.file_type().is_symlink() {
            return Err(LinkError::NotASymlink {
                path: link.to_path_buf(),
            });
        }

        #[cfg(windows)]
        if metadata.file_type().is_dir() {
            return tokio::fs::remove_dir(link)
                .await
                .map_err(|e| LinkError::RemoveFailed {
                    path: link.to_path_buf(),
                    source: e,
                });
        }

        tokio::fs::remove_file(link)
            .await
            .map_err(|e| LinkError::RemoveFailed {
                path: link.to_path_buf(),
                source: e,
            })
    }
}

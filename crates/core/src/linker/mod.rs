//! Filesystem reconciliation: creates symlinks for newly matched items and
//! removes symlinks for items no longer desired, mirroring each item's
//! relative path inside its source folder under the destination root.

mod error;
mod traits;

pub use error::LinkError;
pub use traits::{LinkOps, NativeLinkOps};

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use tracing::{debug, info, warn};

use crate::catalog::{CatalogItem, MediaCatalog};
use crate::recipe::LibraryKind;

/// Counts for one link or unlink batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkReport {
    pub created: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Filesystem reconciler for one destination folder.
pub struct Reconciler<'a> {
    ops: &'a dyn LinkOps,
    source_folders: &'a [PathBuf],
    dest_folder: &'a Path,
    kind: LibraryKind,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        ops: &'a dyn LinkOps,
        source_folders: &'a [PathBuf],
        dest_folder: &'a Path,
        kind: LibraryKind,
    ) -> Self {
        Self {
            ops,
            source_folders,
            dest_folder,
            kind,
        }
    }

    /// Create links for the given catalog items. Individual failures are
    /// logged and skipped; they never abort the batch.
    pub async fn link(
        &self,
        items: &[CatalogItem],
        catalog: &dyn MediaCatalog,
    ) -> LinkReport {
        let mut report = LinkReport::default();

        for item in items {
            let files = match catalog.item_files(&item.rating_key, self.kind).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("Could not list files for '{}': {}", item.title, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.kind {
                LibraryKind::Movie => self.link_movie(item, &files, &mut report).await,
                LibraryKind::Tv => self.link_show(item, &files, &mut report).await,
            }
        }

        info!("Created symlinks for {} new items", report.created);
        report
    }

    /// Remove links for the given catalog items (whose files now live
    /// under the destination folder). Individual failures are logged and
    /// skipped.
    pub async fn unlink(
        &self,
        items: &[CatalogItem],
        catalog: &dyn MediaCatalog,
    ) -> LinkReport {
        let mut report = LinkReport::default();

        for item in items {
            let files = match catalog.item_files(&item.rating_key, self.kind).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("Could not list files for '{}': {}", item.title, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.kind {
                LibraryKind::Movie => self.unlink_movie(item, &files, &mut report).await,
                LibraryKind::Tv => self.unlink_show(item, &files, &mut report).await,
            }
        }

        info!("Removed symlinks for {} items", report.removed);
        report
    }

    /// One link per physical part: a single-file symlink when the part
    /// sits directly in a source folder, otherwise a directory-level
    /// symlink recreating the part's relative directory.
    async fn link_movie(&self, item: &CatalogItem, files: &[PathBuf], report: &mut LinkReport) {
        for file in files {
            let Some(file_dir) = file.parent() else { continue };
            let Some(rel) = self.source_relative(file_dir) else {
                debug!(
                    "'{}' is outside every source folder: {}",
                    item.title,
                    file.display()
                );
                continue;
            };

            let (target, link, directory) = if rel.as_os_str().is_empty() {
                let Some(name) = file.file_name() else { continue };
                (file.clone(), self.dest_folder.join(name), false)
            } else {
                (file_dir.to_path_buf(), self.dest_folder.join(&rel), true)
            };

            if let Err(e) = self.prepare_target(&link).await {
                warn!("Symlink failed for {}: {}", link.display(), e);
                report.failed += 1;
                continue;
            }

            let exists = if directory {
                link.exists()
            } else {
                link.is_file()
            };
            if exists {
                report.skipped += 1;
                continue;
            }

            match self.ops.create_link(&target, &link, directory).await {
                Ok(()) => {
                    info!("{} ({})", item.title, item.year.unwrap_or(0));
                    report.created += 1;
                }
                Err(e) => {
                    warn!("Symlink failed for {}: {}", link.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Episodic content is linked as one directory-level symlink to the
    /// show's top directory under its source folder, not per episode.
    async fn link_show(&self, item: &CatalogItem, files: &[PathBuf], report: &mut LinkReport) {
        for file in files {
            let Some(file_dir) = file.parent() else { continue };
            let Some((folder, rel)) = self.source_folder_and_relative(file_dir) else {
                continue;
            };
            let Some(top) = rel.components().next() else { continue };
            let top = top.as_os_str();

            let target = folder.join(top);
            let link = self.dest_folder.join(top);

            if link.exists() {
                report.skipped += 1;
                return;
            }

            match self.ops.create_link(&target, &link, true).await {
                Ok(()) => {
                    info!("{} ({})", item.title, item.year.unwrap_or(0));
                    report.created += 1;
                    return;
                }
                Err(e) => {
                    warn!("Symlink failed for {}: {}", link.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    async fn unlink_movie(&self, item: &CatalogItem, files: &[PathBuf], report: &mut LinkReport) {
        for file in files {
            let Some(file_dir) = file.parent() else { continue };
            let Some(rel) = relative_under(file_dir, self.dest_folder) else {
                debug!(
                    "'{}' is outside the destination folder: {}",
                    item.title,
                    file.display()
                );
                continue;
            };

            let link = if rel.as_os_str().is_empty() {
                let Some(name) = file.file_name() else { continue };
                self.dest_folder.join(name)
            } else {
                self.dest_folder.join(&rel)
            };

            if !path_entry_exists(&link) {
                report.skipped += 1;
                continue;
            }

            match self.ops.remove_link(&link).await {
                Ok(()) => {
                    info!("{} ({})", item.title, item.year.unwrap_or(0));
                    report.removed += 1;
                }
                Err(e) => {
                    warn!("Remove symlink failed for {}: {}", link.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    async fn unlink_show(&self, item: &CatalogItem, files: &[PathBuf], report: &mut LinkReport) {
        for file in files {
            let Some(file_dir) = file.parent() else { continue };
            let Some(rel) = relative_under(file_dir, self.dest_folder) else {
                continue;
            };
            let Some(top) = rel.components().next() else { continue };
            let top = top.as_os_str();

            let link = self.dest_folder.join(top);
            if !path_entry_exists(&link) {
                report.skipped += 1;
                return;
            }

            match self.ops.remove_link(&link).await {
                Ok(()) => {
                    info!("{} ({})", item.title, item.year.unwrap_or(0));
                    report.removed += 1;
                    return;
                }
                Err(e) => {
                    warn!("Remove symlink failed for {}: {}", link.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Create the link's parent directories and clear a pre-existing empty
    /// directory at the link path, which would otherwise shadow the link.
    async fn prepare_target(&self, link: &Path) -> Result<(), LinkError> {
        if let Some(parent) = link.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    LinkError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    }
                })?;
            }
        }

        let metadata = match tokio::fs::symlink_metadata(link).await {
            Ok(metadata) => metadata,
            Err(_) => return Ok(()),
        };
        if metadata.file_type().is_dir() && !metadata.file_type().is_symlink() {
            let mut entries = tokio::fs::read_dir(link).await?;
            if entries.next_entry().await?.is_none() {
                debug!("Removing empty directory at {}", link.display());
                tokio::fs::remove_dir(link).await?;
            }
        }
        Ok(())
    }

    fn source_relative(&self, dir: &Path) -> Option<PathBuf> {
        self.source_folder_and_relative(dir).map(|(_, rel)| rel)
    }

    fn source_folder_and_relative(&self, dir: &Path) -> Option<(&PathBuf, PathBuf)> {
        self.source_folders
            .iter()
            .find_map(|folder| relative_under(dir, folder).map(|rel| (folder, rel)))
    }
}

/// `path` relative to `root`, matching the root prefix case-insensitively
/// and only at a component boundary. `Some("")` means `path` is the root
/// itself; `None` means it is outside the root.
fn relative_under(path: &Path, root: &Path) -> Option<PathBuf> {
    let path_str = path.to_string_lossy();
    let root_str = root.to_string_lossy();
    let root_str = root_str.trim_end_matches(MAIN_SEPARATOR);

    let Some(prefix) = path_str.get(..root_str.len()) else {
        return None;
    };
    if !prefix.eq_ignore_ascii_case(root_str) {
        return None;
    }

    let rest = &path_str[root_str.len()..];
    if !rest.is_empty() && !rest.starts_with(MAIN_SEPARATOR) {
        return None;
    }

    Some(PathBuf::from(
        rest.trim_start_matches(MAIN_SEPARATOR).to_string(),
    ))
}

/// Whether a directory entry exists at `path`, without following symlinks
/// (a dangling symlink still counts).
fn path_entry_exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

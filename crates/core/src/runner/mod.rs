//! The recipe runner: sequences aggregation, ranking, matching,
//! filesystem reconciliation and sort-order assignment into one
//! idempotent convergence run.

mod types;

pub use types::{RunError, RunReport};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, shift_years_back, Aggregated};
use crate::catalog::{CatalogError, CatalogItem, CatalogSection, MediaCatalog};
use crate::index::{build_index, resolve_identities, AllowList, IdentifierCache, IdentityIndex};
use crate::linker::{LinkOps, Reconciler};
use crate::matcher::{match_candidates, MatchReport};
use crate::metadata::DetailsProvider;
use crate::ranking::{RankingOptions, WeightedRanking};
use crate::recipe::{NewLibrary, Recipe};
use crate::sources::SourceResolver;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Warn about a still-running refresh every this many polls.
const POLLS_PER_WARNING: u32 = 12;

/// Drives one recipe run against the configured collaborators.
pub struct RecipeRunner {
    recipe: Recipe,
    catalog: Arc<dyn MediaCatalog>,
    sources: Arc<dyn SourceResolver>,
    details: Option<Arc<dyn DetailsProvider>>,
    link_ops: Arc<dyn LinkOps>,
    cache: IdentifierCache,
    poll_interval: Duration,
}

impl RecipeRunner {
    pub fn new(
        recipe: Recipe,
        catalog: Arc<dyn MediaCatalog>,
        sources: Arc<dyn SourceResolver>,
        details: Option<Arc<dyn DetailsProvider>>,
        link_ops: Arc<dyn LinkOps>,
        cache: IdentifierCache,
    ) -> Self {
        Self {
            recipe,
            catalog,
            sources,
            details,
            link_ops,
            cache,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the refresh poll interval (tests).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Full convergence run: aggregate, rank, match, reconcile the
    /// filesystem, wait for the catalog, apply sort order and the removal
    /// policy.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let kind = self.recipe.library_type;
        let agg = self.collect_candidates().await?;

        let absolute = self
            .recipe
            .new_library
            .as_ref()
            .map(|l| l.sort_title.absolute)
            .unwrap_or(false);

        info!("Trying to match with items from the source libraries");
        let src_index = self.build_source_index(&agg).await?;
        let report = match_candidates(agg.items, &src_index, self.recipe.max_count(), absolute);

        if self.recipe.playlist.is_some() {
            let item_count = self.apply_playlist(&report).await?;
            return Ok(RunReport {
                missing: report.missing,
                item_count,
                created_links: 0,
                removed_links: 0,
            });
        }

        let lib = self
            .recipe
            .new_library
            .as_ref()
            .expect("validated: new_library or playlist is set");

        if !lib.folder.exists() {
            tokio::fs::create_dir_all(&lib.folder).await.map_err(|e| {
                RunError::DestinationFolder {
                    path: lib.folder.clone(),
                    source: e,
                }
            })?;
        }

        info!(
            "Creating symlinks for {} matching items in the library...",
            report.matched_total
        );
        let folders = self.source_folders();
        let reconciler = Reconciler::new(self.link_ops.as_ref(), &folders, &lib.folder, kind);
        let link_report = reconciler.link(&report.matched_items, self.catalog.as_ref()).await;

        let section = self.ensure_destination_section(lib).await?;
        self.wait_for_refresh(&section.id, &lib.name, lib.refresh_timeout_secs)
            .await?;

        info!("Retrieving a list of items from the '{}' library...", lib.name);
        let dest_items = self.catalog.section_items(&section.id).await?;
        let mut item_count = dest_items.len();
        let mut dest_index =
            build_index(self.catalog.as_ref(), &self.cache, &section.id, dest_items, None).await;

        // Assign sort order in final candidate order. Absolute mode
        // numbers by position in the sequence (placeholders included);
        // relative mode numbers only successfully applied items.
        if lib.sort {
            info!("Setting the sort titles for the '{}' library...", lib.name);
        }
        let mut counter: u32 = 0;
        for (i, candidate) in report.candidates.iter().enumerate() {
            let Some(item) =
                dest_index.pop(Some(&candidate.imdb_id), candidate.tmdb_id, candidate.tvdb_id)
            else {
                continue;
            };
            counter += 1;
            if !lib.sort {
                continue;
            }
            let number = if absolute { (i + 1) as u32 } else { counter };
            self.push_sort_title(&section.id, &item.rating_key, number, &candidate.title, lib)
                .await;
        }

        // Whatever is still in the destination index no longer qualifies:
        // remove it per policy, or append it to the sort order so nothing
        // silently drops from view.
        let leftovers = dest_index.drain_remaining();
        let mut append_counter = if absolute {
            report.candidates.len() as u32
        } else {
            counter
        };
        let mut removed_links = 0;

        if lib.remove_from_library || lib.remove_older_than_max_age {
            let (to_remove, to_keep) = self.partition_for_removal(lib, leftovers);

            if !to_remove.is_empty() {
                info!("Removing symlinks for items which no longer qualify");
                let unlink_report = reconciler.unlink(&to_remove, self.catalog.as_ref()).await;
                removed_links = unlink_report.removed;

                if removed_links > 0 {
                    info!("Scanning the '{}' library...", lib.name);
                    self.catalog.refresh_section(&section.id).await?;
                    self.wait_for_refresh(&section.id, &lib.name, lib.refresh_timeout_secs)
                        .await?;
                    self.catalog.empty_trash(&section.id).await?;
                    item_count = self.catalog.section_items(&section.id).await?.len();
                }
            }

            for item in to_keep {
                append_counter += 1;
                if lib.sort {
                    self.push_sort_title(
                        &section.id,
                        &item.rating_key,
                        append_counter,
                        &item.title,
                        lib,
                    )
                    .await;
                }
            }
        } else {
            for item in leftovers {
                append_counter += 1;
                if lib.sort {
                    self.push_sort_title(
                        &section.id,
                        &item.rating_key,
                        append_counter,
                        &item.title,
                        lib,
                    )
                    .await;
                }
            }
        }

        Ok(RunReport {
            missing: report.missing,
            item_count,
            created_links: link_report.created,
            removed_links,
        })
    }

    /// Sort-only run: re-rank and re-number the existing destination
    /// library without touching the filesystem. The destination section
    /// must already exist.
    pub async fn run_sort_only(&self) -> Result<RunReport, RunError> {
        if self.recipe.playlist.is_some() {
            return Err(RunError::InvalidRecipe(
                "sort-only does not apply to playlist recipes".to_string(),
            ));
        }
        let lib = self
            .recipe
            .new_library
            .as_ref()
            .expect("validated: new_library or playlist is set");

        let agg = self.collect_candidates().await?;

        let section = self
            .catalog
            .section_by_name(&lib.name)
            .await?
            .ok_or_else(|| CatalogError::SectionNotFound(lib.name.clone()))?;

        self.catalog.refresh_section(&section.id).await?;
        self.wait_for_refresh(&section.id, &lib.name, lib.refresh_timeout_secs)
            .await?;

        info!("Retrieving a list of items from the '{}' library...", lib.name);
        let dest_items = self.catalog.section_items(&section.id).await?;
        let item_count = dest_items.len();
        let mut dest_index =
            build_index(self.catalog.as_ref(), &self.cache, &section.id, dest_items, None).await;

        info!("Setting the sort titles for the '{}' library...", lib.name);
        let absolute = lib.sort_title.absolute;
        let mut counter: u32 = 0;
        for (i, candidate) in agg.items.iter().enumerate() {
            let Some(item) =
                dest_index.pop(Some(&candidate.imdb_id), candidate.tmdb_id, candidate.tvdb_id)
            else {
                continue;
            };
            let number = if absolute {
                (i + 1) as u32
            } else {
                counter += 1;
                counter
            };
            self.push_sort_title(&section.id, &item.rating_key, number, &candidate.title, lib)
                .await;
        }

        if !absolute {
            for item in dest_index.drain_remaining() {
                counter += 1;
                self.push_sort_title(&section.id, &item.rating_key, counter, &item.title, lib)
                    .await;
            }
        }

        Ok(RunReport {
            missing: Vec::new(),
            item_count,
            created_links: 0,
            removed_links: 0,
        })
    }

    /// Aggregate the configured lists and apply weighted sorting when
    /// enabled and a details provider is available.
    async fn collect_candidates(&self) -> Result<Aggregated, RunError> {
        let agg = aggregate(
            self.sources.as_ref(),
            &self.recipe.source_list_urls,
            self.recipe.library_type,
            self.recipe.max_age(),
        )
        .await?;

        if !self.recipe.weighted_sorting.enabled {
            return Ok(agg);
        }

        let Some(provider) = &self.details else {
            warn!("A TMDb API key is required for weighted sorting");
            return Ok(agg);
        };

        info!("Getting metadata to add weighted sorting...");
        let ranking = WeightedRanking::new(RankingOptions {
            weights: self.recipe.weighted_sorting.weights.clone(),
            better_release_date: self.recipe.weighted_sorting.better_release_date,
            max_age_years: self.recipe.max_age(),
            kind: self.recipe.library_type,
        });
        let items = ranking.rank(agg.items, provider.as_ref()).await;

        Ok(Aggregated {
            items,
            seen: agg.seen,
        })
    }

    /// Matching-only index over every configured source library,
    /// restricted to the identifiers the current run cares about.
    async fn build_source_index(&self, agg: &Aggregated) -> Result<IdentityIndex, RunError> {
        let allow = AllowList::from_tokens(&agg.seen);
        let mut index = IdentityIndex::matching_only(allow);

        for lib in &self.recipe.source_libraries {
            let section = self
                .catalog
                .section_by_name(&lib.name)
                .await?
                .ok_or_else(|| CatalogError::SectionNotFound(lib.name.clone()))?;
            let items = self.catalog.section_items(&section.id).await?;
            debug!("Scanning {} items in '{}'", items.len(), lib.name);

            for item in items {
                let keys =
                    resolve_identities(&item, self.catalog.as_ref(), &self.cache, &section.id)
                        .await;
                index.add(item, &keys);
            }
        }

        Ok(index)
    }

    /// Look up the destination section, creating it when missing, and
    /// kick off a scan when it already exists.
    async fn ensure_destination_section(
        &self,
        lib: &NewLibrary,
    ) -> Result<CatalogSection, RunError> {
        if let Some(section) = self.catalog.section_by_name(&lib.name).await? {
            info!("Library already exists. Scanning the library...");
            self.catalog.refresh_section(&section.id).await?;
            return Ok(section);
        }

        info!("Creating the '{}' library...", lib.name);
        self.catalog
            .create_section(&lib.name, &lib.folder, self.recipe.library_type)
            .await?;
        self.catalog
            .section_by_name(&lib.name)
            .await?
            .ok_or_else(|| CatalogError::SectionNotFound(lib.name.clone()).into())
    }

    /// Block until the section's asynchronous refresh completes. With a
    /// zero bound this waits forever, matching catalog behavior; a warning
    /// fires periodically so a stuck scan is visible.
    async fn wait_for_refresh(
        &self,
        section_id: &str,
        name: &str,
        timeout_secs: u64,
    ) -> Result<(), RunError> {
        info!("Waiting for metadata to finish downloading...");
        let started = Instant::now();
        let mut polls: u32 = 0;

        while self.catalog.section_refreshing(section_id).await? {
            polls += 1;
            if polls % POLLS_PER_WARNING == 0 {
                warn!(
                    "Still waiting for the '{}' library to finish refreshing ({}s)",
                    name,
                    started.elapsed().as_secs()
                );
            }
            if timeout_secs > 0 && started.elapsed() >= Duration::from_secs(timeout_secs) {
                return Err(RunError::RefreshTimeout {
                    section: name.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Split the leftover destination items per removal policy:
    /// unconditional removal takes everything, age-gated removal takes
    /// only items older than the retention window.
    fn partition_for_removal(
        &self,
        lib: &NewLibrary,
        leftovers: Vec<CatalogItem>,
    ) -> (Vec<CatalogItem>, Vec<CatalogItem>) {
        if lib.remove_from_library {
            return (leftovers, Vec::new());
        }

        if lib.max_age == 0 {
            // Age-gated removal without a window keeps everything
            return (Vec::new(), leftovers);
        }

        let cutoff = shift_years_back(Local::now().date_naive(), lib.max_age);
        leftovers.into_iter().partition(|item| {
            let effective = item
                .originally_available
                .or_else(|| item.year.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)));
            match effective {
                Some(date) => date < cutoff,
                None => {
                    warn!("'{}' has no release date; retaining it", item.title);
                    false
                }
            }
        })
    }

    /// Replace the playlist for the admin account and, when shared, for
    /// every account with server access. Returns the item count.
    async fn apply_playlist(&self, report: &MatchReport) -> Result<usize, RunError> {
        let sink = self
            .recipe
            .playlist
            .as_ref()
            .expect("validated: playlist is set");

        let mut seen = HashSet::new();
        let rating_keys: Vec<String> = report
            .matched_items
            .iter()
            .filter(|item| seen.insert(item.rating_key.clone()))
            .map(|item| item.rating_key.clone())
            .collect();

        info!(
            "Updating the '{}' playlist with {} items",
            sink.name,
            rating_keys.len()
        );
        self.catalog
            .replace_playlist(&sink.name, &rating_keys, None)
            .await?;

        if sink.shared {
            // Admin first, then one explicit pass per account
            for account in self.catalog.accounts().await? {
                debug!("Updating the '{}' playlist for {}", sink.name, account.name);
                if let Err(e) = self
                    .catalog
                    .replace_playlist(&sink.name, &rating_keys, Some(&account.token))
                    .await
                {
                    warn!(
                        "Playlist update failed for account {}: {}",
                        account.name, e
                    );
                }
            }
        }

        Ok(rating_keys.len())
    }

    /// Push one sort-title assignment; a failed push is logged and the
    /// run continues.
    async fn push_sort_title(
        &self,
        section_id: &str,
        rating_key: &str,
        number: u32,
        title: &str,
        lib: &NewLibrary,
    ) {
        if let Err(e) = self
            .catalog
            .set_sort_title(
                section_id,
                rating_key,
                number,
                title,
                self.recipe.library_type,
                &lib.sort_title.format,
                lib.sort_title.visible,
            )
            .await
        {
            warn!("Failed to set sort title for '{}': {}", title, e);
        }
    }

    fn source_folders(&self) -> Vec<PathBuf> {
        self.recipe
            .source_libraries
            .iter()
            .flat_map(|lib| lib.folders.iter().cloned())
            .collect()
    }
}

//! Recipe run lifecycle integration tests.
//!
//! These drive the full runner against mock collaborators and a tempdir
//! filesystem:
//! - matching, linking and sort-order assignment
//! - idempotent convergence across repeated runs
//! - removal policy (unconditional and age-gated)
//! - playlist mode with account fan-out

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local};
use tempfile::TempDir;

use frontrow_core::{
    catalog::CatalogAccount,
    recipe::load_recipe_from_str,
    sources::CutoffKind,
    testing::{fixtures, MockCatalog, MockSource, TableSourceResolver},
    CatalogError, IdentifierCache, MediaCatalog, NativeLinkOps, RecipeRunner, RunError,
};

const LIST_URL: &str = "https://api.trakt.tv/movies/trending?limit=10";

/// Test helper wiring a runner to mock collaborators over a tempdir tree.
struct TestHarness {
    catalog: Arc<MockCatalog>,
    source: Arc<MockSource>,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("Movies")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("Trending")).unwrap();

        let catalog = Arc::new(MockCatalog::new());
        catalog.add_section("1", "Movies").await;
        catalog.add_section("2", "Movies - Trending").await;
        catalog.set_refresh_poll_count(1).await;

        let source = Arc::new(MockSource::new("trakt", CutoffKind::Year));

        Self {
            catalog,
            source,
            temp_dir,
        }
    }

    fn source_folder(&self) -> PathBuf {
        self.temp_dir.path().join("Movies")
    }

    fn dest_folder(&self) -> PathBuf {
        self.temp_dir.path().join("Trending")
    }

    fn recipe_yaml(&self, extra_library_fields: &str) -> String {
        format!(
            r#"
library_type: movie
source_list_urls:
  - {url}
source_libraries:
  - name: Movies
    folders:
      - {source}
new_library:
  name: Movies - Trending
  folder: {dest}
{extra}
"#,
            url = LIST_URL,
            source = self.source_folder().display(),
            dest = self.dest_folder().display(),
            extra = extra_library_fields,
        )
    }

    fn runner(&self, recipe_yaml: &str) -> RecipeRunner {
        let recipe = load_recipe_from_str(recipe_yaml).expect("Failed to parse recipe");

        let mut resolver = TableSourceResolver::new();
        resolver.insert(LIST_URL, Arc::clone(&self.source) as _);

        RecipeRunner::new(
            recipe,
            Arc::clone(&self.catalog) as _,
            Arc::new(resolver),
            None,
            Arc::new(NativeLinkOps),
            IdentifierCache::in_memory().unwrap(),
        )
        .with_poll_interval(Duration::from_millis(1))
    }

    /// A movie in the source library: a physical directory with one file,
    /// a source-section catalog item, and its file registered.
    async fn seed_source_movie(&self, rating_key: &str, imdb: &str, title: &str, year: i32) {
        let dir = self.source_folder().join(format!("{} ({})", title, year));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("movie.mkv");
        std::fs::write(&file, "media").unwrap();

        let mut items = self.catalog.section_items("1").await.unwrap();
        items.push(fixtures::catalog_item(
            rating_key,
            Some(&format!("imdb://{}", imdb)),
            title,
            year,
        ));
        self.catalog.set_section_items("1", items).await;
        self.catalog.set_item_files(rating_key, vec![file]).await;
    }

    /// A destination-section catalog item, as the server would report it
    /// after scanning the symlink tree.
    async fn seed_dest_item(&self, rating_key: &str, imdb: &str, title: &str, year: i32) {
        let mut items = self.catalog.section_items("2").await.unwrap();
        items.push(fixtures::catalog_item(
            rating_key,
            Some(&format!("imdb://{}", imdb)),
            title,
            year,
        ));
        self.catalog.set_section_items("2", items).await;
    }

    /// A leftover destination item whose symlink already exists on disk.
    async fn seed_linked_leftover(&self, rating_key: &str, imdb: &str, title: &str, year: i32) {
        let source_dir = self.source_folder().join(format!("{} ({})", title, year));
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join("movie.mkv"), "media").unwrap();

        let link = self.dest_folder().join(format!("{} ({})", title, year));
        std::os::unix::fs::symlink(&source_dir, &link).unwrap();

        self.seed_dest_item(rating_key, imdb, title, year).await;
        self.catalog
            .set_item_files(rating_key, vec![link.join("movie.mkv")])
            .await;
    }
}

#[tokio::test]
async fn test_match_link_and_sort_relative() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![
            fixtures::raw_item("tt1", None, "A", 2020),
            fixtures::raw_item("tt2", None, "B", 2021),
        ])
        .await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;
    harness.seed_dest_item("dest-2", "tt2", "B", 2021).await;

    let runner = harness.runner(&harness.recipe_yaml(""));
    let report = runner.run().await.unwrap();

    // tt1 is reported missing with its aggregated index
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].0, 0);
    assert_eq!(report.missing[0].1.imdb_id, "tt1");

    // tt2 was linked
    assert_eq!(report.created_links, 1);
    let link = harness.dest_folder().join("B (2021)");
    assert!(std::fs::symlink_metadata(&link)
        .unwrap()
        .file_type()
        .is_symlink());

    // Relative mode: the one matched item gets sort order 1
    let calls = harness.catalog.sort_title_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].rating_key, "dest-2");
    assert_eq!(calls[0].number, 1);
    assert_eq!(calls[0].title, "B");

    assert_eq!(report.item_count, 1);
    assert_eq!(report.removed_links, 0);
}

#[tokio::test]
async fn test_absolute_order_numbers_by_position() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![
            fixtures::raw_item("tt1", None, "A", 2020),
            fixtures::raw_item("tt2", None, "B", 2021),
        ])
        .await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;
    harness.seed_dest_item("dest-2", "tt2", "B", 2021).await;

    let runner = harness.runner(&harness.recipe_yaml(
        "  sort_title:\n    absolute: true\n",
    ));
    let report = runner.run().await.unwrap();

    // Absolute mode: tt2 keeps its original rank even though tt1 missed
    let calls = harness.catalog.sort_title_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].number, 2);
    assert_eq!(report.missing.len(), 1);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![fixtures::raw_item("tt2", None, "B", 2021)])
        .await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;
    harness.seed_dest_item("dest-2", "tt2", "B", 2021).await;

    let yaml = harness.recipe_yaml("");
    let report = harness.runner(&yaml).run().await.unwrap();
    assert_eq!(report.created_links, 1);

    // Unchanged source and catalog: the second run performs zero link
    // operations
    let report = harness.runner(&yaml).run().await.unwrap();
    assert_eq!(report.created_links, 0);
    assert_eq!(report.removed_links, 0);
    assert_eq!(report.missing.len(), 0);
}

#[tokio::test]
async fn test_unconditional_removal() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![fixtures::raw_item("tt2", None, "B", 2021)])
        .await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;
    harness.seed_dest_item("dest-2", "tt2", "B", 2021).await;
    harness
        .seed_linked_leftover("dest-9", "tt9", "Stale", 2001)
        .await;

    let runner = harness.runner(&harness.recipe_yaml("  remove_from_library: true\n"));
    let report = runner.run().await.unwrap();

    assert_eq!(report.removed_links, 1);
    assert!(std::fs::symlink_metadata(harness.dest_folder().join("Stale (2001)")).is_err());

    // Removal triggers a second refresh cycle plus a trash-empty call
    assert_eq!(harness.catalog.refresh_calls().await.len(), 2);
    assert_eq!(harness.catalog.empty_trash_calls().await, vec!["2"]);
}

#[tokio::test]
async fn test_age_gated_removal_retains_recent_items() {
    let harness = TestHarness::new().await;
    let this_year = Local::now().date_naive().year();

    harness
        .source
        .set_items(vec![fixtures::raw_item("tt2", None, "B", this_year)])
        .await;
    harness
        .seed_source_movie("src-2", "tt2", "B", this_year)
        .await;
    harness.seed_dest_item("dest-2", "tt2", "B", this_year).await;

    // Two non-qualifying leftovers: one far older than the 3-year window,
    // one inside it
    harness
        .seed_linked_leftover("dest-old", "tt8", "Ancient", 2000)
        .await;
    harness
        .seed_linked_leftover("dest-new", "tt9", "Fresh", this_year - 1)
        .await;

    let runner = harness.runner(&harness.recipe_yaml(
        "  max_age: 3\n  remove_older_than_max_age: true\n",
    ));
    let report = runner.run().await.unwrap();

    // Only the item beyond the cutoff is removed
    assert_eq!(report.removed_links, 1);
    assert!(std::fs::symlink_metadata(harness.dest_folder().join("Ancient (2000)")).is_err());
    assert!(std::fs::symlink_metadata(
        harness
            .dest_folder()
            .join(format!("Fresh ({})", this_year - 1))
    )
    .is_ok());

    // The retained leftover is appended to the sort order after the
    // matched item, so it stays visible
    let calls = harness.catalog.sort_title_calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].rating_key, "dest-2");
    assert_eq!(calls[0].number, 1);
    assert_eq!(calls[1].rating_key, "dest-new");
    assert_eq!(calls[1].number, 2);
}

#[tokio::test]
async fn test_no_removal_policy_appends_leftovers() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![fixtures::raw_item("tt2", None, "B", 2021)])
        .await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;
    harness.seed_dest_item("dest-2", "tt2", "B", 2021).await;
    harness
        .seed_linked_leftover("dest-9", "tt9", "Lingering", 2001)
        .await;

    let runner = harness.runner(&harness.recipe_yaml(""));
    let report = runner.run().await.unwrap();

    // Nothing is removed and the leftover is numbered after the matches
    assert_eq!(report.removed_links, 0);
    let calls = harness.catalog.sort_title_calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].rating_key, "dest-9");
    assert_eq!(calls[1].number, 2);
    assert_eq!(calls[1].title, "Lingering");
}

#[tokio::test]
async fn test_playlist_mode_fans_out_to_accounts() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![
            fixtures::raw_item("tt1", None, "A", 2020),
            fixtures::raw_item("tt2", None, "B", 2021),
        ])
        .await;
    harness.seed_source_movie("src-1", "tt1", "A", 2020).await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;
    harness
        .catalog
        .set_accounts(vec![CatalogAccount {
            id: "7".to_string(),
            name: "kid".to_string(),
            token: "kid-token".to_string(),
        }])
        .await;

    let yaml = format!(
        r#"
library_type: movie
source_list_urls:
  - {url}
source_libraries:
  - name: Movies
    folders:
      - {source}
playlist:
  name: Trending Now
  shared: true
"#,
        url = LIST_URL,
        source = harness.source_folder().display(),
    );

    let report = harness.runner(&yaml).run().await.unwrap();
    assert_eq!(report.item_count, 2);
    assert_eq!(report.created_links, 0);

    // Admin write first, then one per account, same items in list order
    let calls = harness.catalog.playlist_calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].account_token, None);
    assert_eq!(calls[0].rating_keys, vec!["src-1", "src-2"]);
    assert_eq!(calls[1].account_token.as_deref(), Some("kid-token"));
    assert_eq!(calls[1].rating_keys, vec!["src-1", "src-2"]);
}

#[tokio::test]
async fn test_sort_only_leaves_filesystem_alone() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![
            fixtures::raw_item("tt1", None, "A", 2020),
            fixtures::raw_item("tt2", None, "B", 2021),
        ])
        .await;
    harness.seed_dest_item("dest-2", "tt2", "B", 2021).await;
    harness.seed_dest_item("dest-5", "tt5", "Extra", 2019).await;

    let report = harness
        .runner(&harness.recipe_yaml(""))
        .run_sort_only()
        .await
        .unwrap();

    assert_eq!(report.created_links, 0);
    assert_eq!(report.item_count, 2);
    // No symlinks were created anywhere
    assert_eq!(std::fs::read_dir(harness.dest_folder()).unwrap().count(), 0);

    // tt2 matches the list order; the unmatched destination item is
    // appended after it
    let calls = harness.catalog.sort_title_calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].rating_key, "dest-2");
    assert_eq!(calls[0].number, 1);
    assert_eq!(calls[1].rating_key, "dest-5");
    assert_eq!(calls[1].number, 2);
}

#[tokio::test]
async fn test_missing_source_library_is_fatal() {
    let harness = TestHarness::new().await;
    harness
        .source
        .set_items(vec![fixtures::raw_item("tt1", None, "A", 2020)])
        .await;

    let yaml = harness
        .recipe_yaml("")
        .replace("name: Movies", "name: Does Not Exist");
    let result = harness.runner(&yaml).run().await;

    assert!(matches!(
        result,
        Err(RunError::Catalog(CatalogError::SectionNotFound(_)))
    ));
}

#[tokio::test]
async fn test_sort_only_requires_existing_destination() {
    let harness = TestHarness::new().await;
    harness
        .source
        .set_items(vec![fixtures::raw_item("tt1", None, "A", 2020)])
        .await;

    let yaml = harness
        .recipe_yaml("")
        .replace("name: Movies - Trending", "name: Not Created Yet");
    let result = harness.runner(&yaml).run_sort_only().await;

    assert!(matches!(
        result,
        Err(RunError::Catalog(CatalogError::SectionNotFound(_)))
    ));
}

#[tokio::test]
async fn test_creates_missing_destination_section() {
    let harness = TestHarness::new().await;

    harness
        .source
        .set_items(vec![fixtures::raw_item("tt2", None, "B", 2021)])
        .await;
    harness.seed_source_movie("src-2", "tt2", "B", 2021).await;

    let yaml = harness
        .recipe_yaml("")
        .replace("name: Movies - Trending", "name: Brand New");
    let report = harness.runner(&yaml).run().await.unwrap();

    let created = harness.catalog.created_sections().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "Brand New");
    assert_eq!(created[0].1, harness.dest_folder());
    // The new section is empty until the server scans it
    assert_eq!(report.item_count, 0);
}

//! frontrow: maintain derived media libraries from external ranked lists.
//!
//! Wires the configured collaborator clients to the core recipe runner.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frontrow_core::{
    list_recipes, load_config, load_recipe, validate_config, metadata::DetailsProvider,
    IdentifierCache, ImdbChartSource, NativeLinkOps, PlexCatalog, RecipeRunner, RunReport,
    SourceSet, TmdbClient, TraktSource, TvdbClient,
};

#[derive(Parser)]
#[command(
    name = "frontrow",
    version,
    about = "Maintain derived media libraries from external ranked lists"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FRONTROW_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a recipe
    Run {
        /// Recipe name (a file in the recipe directory)
        recipe: String,
        /// Only re-apply the sort order; skip filesystem changes
        #[arg(short, long)]
        sort_only: bool,
    },
    /// List the available recipes
    ListRecipes,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command {
        Command::ListRecipes => {
            for name in list_recipes(&config.recipe_dir)? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Run { recipe, sort_only } => {
            let recipe_name = recipe;
            let recipe = load_recipe(&config.recipe_dir, &recipe_name)
                .with_context(|| format!("Failed to load recipe '{recipe_name}'"))?;

            info!("Running the recipe '{}'", recipe_name);

            let catalog = Arc::new(
                PlexCatalog::connect(config.catalog.clone())
                    .await
                    .context("Failed to reach the catalog server")?,
            );

            let tmdb = config
                .tmdb
                .clone()
                .map(TmdbClient::new)
                .transpose()
                .context("Failed to create TMDb client")?
                .map(Arc::new);
            let tvdb = config
                .tvdb
                .clone()
                .map(TvdbClient::new)
                .transpose()
                .context("Failed to create TVDb client")?
                .map(Arc::new);
            let trakt = config
                .trakt
                .clone()
                .map(TraktSource::new)
                .transpose()
                .context("Failed to create Trakt client")?
                .map(Arc::new);
            let imdb = tmdb
                .as_ref()
                .map(|tmdb| ImdbChartSource::new(Arc::clone(tmdb), tvdb.clone()))
                .transpose()
                .context("Failed to create IMDb chart client")?
                .map(Arc::new);

            let sources = Arc::new(SourceSet::new(trakt, imdb));
            let details = tmdb.map(|tmdb| tmdb as Arc<dyn DetailsProvider>);

            let cache = IdentifierCache::open(&config.cache.path)
                .context("Failed to open the identifier cache")?;

            let runner = RecipeRunner::new(
                recipe,
                catalog,
                sources,
                details,
                Arc::new(NativeLinkOps),
                cache,
            );

            let report = if sort_only {
                info!("Running sort-only");
                runner.run_sort_only().await?
            } else {
                runner.run().await?
            };

            print_summary(&report);
            Ok(())
        }
    }
}

fn print_summary(report: &RunReport) {
    println!("Number of items in the new library: {}", report.item_count);
    if !report.missing.is_empty() {
        println!("Number of missing items: {}", report.missing.len());
        for (idx, item) in &report.missing {
            println!(
                "{}\t{}\t{} ({})",
                idx + 1,
                item.imdb_id,
                item.title,
                item.year.map(|y| y.to_string()).unwrap_or_default()
            );
        }
    }
    println!("Done!");
}

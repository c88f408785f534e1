use anyhow::Context;
use clap::{Parser, Subcommand};
use deal_insight_engine::dataset::ListingSet;
use deal_insight_engine::output::{build_comps_output, build_scored_output, write_json};
use deal_insight_engine::{DealEngine, EngineConfig, ScoredBatch};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deal-insight-engine")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Unsupervised deal scoring for real-estate listings", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score listings with the isolation forest
    Score {
        /// Path to a JSON or CSV listings file
        #[arg(short, long)]
        file: PathBuf,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,

        /// Sub-sample size per tree
        #[arg(long)]
        subsample: Option<usize>,

        /// Fraction of listings flagged as deals
        #[arg(long)]
        contamination: Option<f64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Where to write the scored listings
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of top deals to print
        #[arg(long, default_value_t = 15)]
        top: usize,
    },

    /// Estimate values of active listings from sold comparables
    Comps {
        /// Path to a JSON or CSV listings file
        #[arg(short, long)]
        file: PathBuf,

        /// Where to write the comp analysis
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of deals and overpriced listings to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::load_or_default(cli.config.as_ref())?;

    match cli.command {
        Commands::Score {
            file,
            trees,
            subsample,
            contamination,
            seed,
            output,
            top,
        } => {
            if let Some(trees) = trees {
                config.forest.tree_count = trees;
            }
            if let Some(subsample) = subsample {
                config.forest.subsample_size = subsample;
            }
            if let Some(contamination) = contamination {
                config.forest.contamination = contamination;
            }
            if let Some(seed) = seed {
                config.forest.random_seed = seed;
            }

            let set = ListingSet::from_path(&file)?;
            println!("Loaded {} listings from {:?}", set.len(), file);

            let engine = DealEngine::new(config)?;
            let batch = engine
                .score(&set)
                .with_context(|| format!("Failed to score {:?}", file))?;

            print_top_deals(&batch, top);
            print_city_summary(&batch);

            if let Some(output) = output {
                write_json(&output, &build_scored_output(&batch))?;
            }
        }

        Commands::Comps { file, output, top } => {
            let set = ListingSet::from_path(&file)?;
            println!("Loaded {} listings from {:?}", set.len(), file);

            let engine = DealEngine::new(config)?;
            let report = engine.comps(&set)?;
            println!(
                "Analyzed {} active listings against {} sold",
                report.active_count, report.sold_count
            );

            let deals = report.deals();
            println!("\n=== Priced below comps ({}) ===", deals.len());
            for analysis in deals.iter().take(top) {
                println!(
                    "{:>+7.1}%  ${:<10} est ${:<10} {}",
                    analysis.price_diff_pct,
                    analysis.listing.price().unwrap_or(0.0) as i64,
                    analysis.estimated_value,
                    analysis.listing.address().unwrap_or("-")
                );
            }

            let overpriced = report.overpriced();
            println!("\n=== Priced above comps ({}) ===", overpriced.len());
            for analysis in overpriced.iter().take(top) {
                println!(
                    "{:>+7.1}%  ${:<10} est ${:<10} {}",
                    analysis.price_diff_pct,
                    analysis.listing.price().unwrap_or(0.0) as i64,
                    analysis.estimated_value,
                    analysis.listing.address().unwrap_or("-")
                );
            }

            if let Some(output) = output {
                write_json(&output, &build_comps_output(&report))?;
            }
        }
    }

    Ok(())
}

fn print_top_deals(batch: &ScoredBatch, top: usize) {
    println!(
        "\nScored {} listings ({} excluded), {} deals flagged",
        batch.len(),
        batch.excluded,
        batch.deals_found()
    );
    if let Some(stats) = batch.deal_score_stats() {
        println!(
            "Deal score mean {:.1}, median {:.1}",
            stats.mean, stats.median
        );
    }

    println!("\n=== Top {} for sale ===", top);
    for item in batch.top_for_sale(top) {
        println!(
            "{:>3}  ${:<10} {:>5} sqft  ${:>4}/sqft  {}",
            item.deal_score,
            item.listing.price().unwrap_or(0.0) as i64,
            item.listing.sqft().unwrap_or(0.0) as i64,
            item.price_per_sqft,
            item.listing.address().unwrap_or("-")
        );
    }
}

fn print_city_summary(batch: &ScoredBatch) {
    println!("\n=== Deals by city ===");
    for (city, summary) in batch.cities_with_deals() {
        println!(
            "{:<20} {:>3} deals / {:>4} listings  avg ${}/sqft",
            city, summary.deals, summary.count, summary.avg_ppsf
        );
    }
}

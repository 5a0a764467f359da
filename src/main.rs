use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod aggregate;
mod columns;
mod combine;
mod db;
mod error;
mod models;
mod parser;
mod report;
mod slides;
mod warehouse;

use models::{ManualOverrides, Platform};
use parser::FileFormat;
use slides::SlideInput;

#[derive(Parser)]
#[command(name = "ads-wrapped")]
#[command(about = "Aggregate ad platform exports and generate Wrapped slide decks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OverrideArgs {
    /// Manually entered revenue, used only when no export carries revenue
    #[arg(long)]
    revenue: Option<f64>,
    /// Creative highlight, repeatable
    #[arg(long = "creative")]
    creative: Vec<String>,
    /// Optimization highlight, repeatable
    #[arg(long = "optimization")]
    optimization: Vec<String>,
}

impl OverrideArgs {
    fn into_overrides(self) -> ManualOverrides {
        ManualOverrides {
            revenue: self.revenue,
            creative_highlights: self.creative,
            optimization_highlights: self.optimization,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import one platform's export file (csv, tsv, xls, xlsx)
    Import {
        #[arg(long)]
        file: PathBuf,
        /// meta | google | tiktok | linkedin | other
        #[arg(long)]
        platform: String,
        /// Three-letter currency code carried through to slide payloads
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, default_value = "local")]
        user: String,
        /// Print which header each metric bound to before committing
        #[arg(long)]
        show_bindings: bool,
    },
    /// List the imported channels in the working set
    Channels {
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Combine all imported channels and generate a slide deck
    Generate {
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long, default_value = "Your Ads Wrapped")]
        title: String,
        #[command(flatten)]
        overrides: OverrideArgs,
        /// Also write the generated slides as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a slide deck from a warehouse-shaped JSON summary
    GenerateWarehouse {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long, default_value = "Your Ads Wrapped")]
        title: String,
        #[command(flatten)]
        overrides: OverrideArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown summary of the combined working set
    Report {
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print a stored deck by its share code
    Show {
        #[arg(long)]
        code: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import {
            file,
            platform,
            currency,
            user,
            show_bindings,
        } => {
            let platform = Platform::parse(&platform)
                .with_context(|| format!("unknown platform: {platform}"))?;
            let channel = import_file(&file, platform, currency.as_deref(), show_bindings)?;
            println!(
                "Imported {}: spend {:.2}, {} campaigns, {} days with data.",
                platform.display_name(),
                channel.totals.spend,
                channel.campaigns.len(),
                channel.daily.len()
            );
            db::upsert_channel(&pool, &user, &channel).await?;
        }
        Commands::Channels { user } => {
            let channels = db::fetch_channels(&pool, &user).await?;
            if channels.is_empty() {
                println!("No channels imported yet.");
                return Ok(());
            }
            for channel in &channels {
                println!(
                    "- {}: spend {:.2} {}, {} campaigns, {} days",
                    channel.platform.display_name(),
                    channel.totals.spend,
                    channel.currency,
                    channel.campaigns.len(),
                    channel.daily.len()
                );
            }
        }
        Commands::Generate {
            user,
            title,
            overrides,
            out,
        } => {
            let channels = db::fetch_channels(&pool, &user).await?;
            if channels.is_empty() {
                println!("No channels imported; the deck will only carry intro and recap.");
            }
            let aggregate = combine::combine_channels(&channels);
            let input = SlideInput::from_aggregate(&aggregate, overrides.into_overrides());
            finish_deck(&pool, &user, &title, &input, out.as_deref()).await?;
        }
        Commands::GenerateWarehouse {
            file,
            user,
            title,
            overrides,
            out,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            let summary: warehouse::WarehouseSummary = serde_json::from_str(&raw)
                .context("warehouse summary is not valid JSON for the expected shape")?;
            let input = summary.into_slide_input(overrides.into_overrides());
            finish_deck(&pool, &user, &title, &input, out.as_deref()).await?;
        }
        Commands::Report { user, out } => {
            let channels = db::fetch_channels(&pool, &user).await?;
            let aggregate = combine::combine_channels(&channels);
            std::fs::write(&out, report::build_report(&aggregate))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Show { code } => {
            let Some(wrap) = db::fetch_wrap(&pool, &code).await? else {
                println!("No deck found for code {code}.");
                return Ok(());
            };
            println!("{} ({}, created {})", wrap.title, wrap.share_code, wrap.created_at);
            for slide in &wrap.slides {
                println!("- [{}] {}: {}", slide.id, slide.title, slide.subtitle);
            }
        }
    }

    Ok(())
}

fn import_file(
    path: &Path,
    platform: Platform,
    currency: Option<&str>,
    show_bindings: bool,
) -> anyhow::Result<models::ChannelData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let format = FileFormat::from_extension(extension)?;
    let bytes =
        std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;

    let table = parser::parse_table(&bytes, format, platform)?;
    let resolved = columns::resolve_columns(&table.headers, platform)?;

    if show_bindings {
        println!("Column bindings for {}:", platform.display_name());
        for binding in resolved.bindings() {
            let confidence = if binding.exact { "exact" } else { "fuzzy" };
            println!(
                "  {:?} -> \"{}\" ({confidence})",
                binding.metric, binding.header
            );
        }
    }

    Ok(aggregate::aggregate_rows(
        &table,
        &resolved,
        platform,
        currency.unwrap_or(""),
    ))
}

async fn finish_deck(
    pool: &sqlx::PgPool,
    user: &str,
    title: &str,
    input: &SlideInput,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let deck = slides::derive_slides(input);
    let code = db::insert_wrap(pool, user, title, &deck, &input.overrides).await?;
    println!("Generated {} slides. Share code: {code}", deck.len());

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&deck)?;
        std::fs::write(path, json)?;
        println!("Slides written to {}.", path.display());
    }

    Ok(())
}

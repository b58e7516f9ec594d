mod ai;
mod config;
mod export;
mod gateway;
mod models;
mod parser;
mod presenter;
mod query;
mod render;
mod tui;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use ai::{create_provider, resolve_model, Collaborator};
use config::Config;
use gateway::{GatewayError, SearchGateway};
use models::{RankCeiling, ResultBundle, SearchCriteria};
use presenter::{CategoryFilter, Filters, HiringFilter, ResultPresenter};
use query::QueryBuilder;
use tui::BrowseOutcome;

const SEARCH_FAILED: &str = "We encountered an issue while searching for supervisors. Please try again later or refine your topic.";

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Find PhD supervisors with web-grounded AI search")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model (gemini-flash, gemini-pro, claude-sonnet, claude-haiku)
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for supervisors matching a research topic
    Search {
        /// Research interest / topic
        topic: String,

        /// Target countries, comma separated (default from config, "Global")
        #[arg(long)]
        countries: Option<String>,

        /// University rank ceiling (QS): any, 50, 100, 200, ...
        #[arg(long, default_value = "any")]
        max_rank: RankCeiling,

        /// Prioritize positions with explicit scholarship / funding
        #[arg(long)]
        scholarship: bool,

        /// Your background, e.g. "MSc CS, 3.8 GPA"
        #[arg(long, default_value = "")]
        background: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Find co-authors and peers of one supervisor
    Network {
        /// Supervisor name
        name: String,

        /// Supervisor institution
        #[arg(long)]
        institution: String,

        /// Research topic to keep the network focused on
        #[arg(long, default_value = "")]
        topic: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Parse a saved model response and show it
    Parse {
        /// File holding the raw response text
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct ViewArgs {
    /// Only show supervisors from this country ("All" to disable)
    #[arg(long, default_value = "All")]
    country: String,

    /// Only show supervisors from this institution ("All" to disable)
    #[arg(long, default_value = "All")]
    institution: String,

    /// Hiring filter: all, hiring, other
    #[arg(long, default_value = "all")]
    hiring: HiringFilter,

    /// Case-insensitive match on name or department
    #[arg(long)]
    text: Option<String>,

    /// Write supervisors_export.csv for the shown supervisors, optionally into DIR
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    export: Option<Option<PathBuf>>,

    /// Open the interactive browser
    #[arg(long)]
    browse: bool,
}

impl ViewArgs {
    fn filters(&self) -> Filters {
        Filters {
            text: self.text.clone().unwrap_or_default(),
            country: CategoryFilter::parse(&self.country),
            institution: CategoryFilter::parse(&self.institution),
            hiring: self.hiring,
        }
    }

    fn export_dir(&self, config: &Config) -> Option<PathBuf> {
        self.export
            .as_ref()
            .map(|dir| dir.clone().unwrap_or_else(|| config.export_dir()))
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SCOUT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn connect(model: &str, config: &Config) -> Result<Box<dyn Collaborator>> {
    let spec = resolve_model(model)?;
    tracing::debug!(model = %spec.model_id, name = %spec.short_name, "using model");
    create_provider(&spec, config.request_timeout())
}

/// Logs the real cause and turns request failures into the user message.
fn surface(err: GatewayError, user_message: &str) -> anyhow::Error {
    match err {
        GatewayError::InvalidCriteria(msg) => anyhow!(msg),
        GatewayError::RequestFailed { .. } => {
            tracing::error!("{:#}", anyhow::Error::new(err));
            anyhow!("{}", user_message)
        }
    }
}

fn network_failed(name: &str) -> String {
    format!(
        "We encountered an issue while searching for network of {}. Please try again.",
        name
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let config = Config::load(cli.config.as_deref())?;
    let model = cli.model.clone().unwrap_or_else(|| config.model.clone());
    let queries = QueryBuilder::new(config.max_output_tokens);

    match cli.command {
        Commands::Search {
            topic,
            countries,
            max_rank,
            scholarship,
            background,
            view,
        } => {
            let criteria = SearchCriteria::new(topic)?
                .with_countries(countries.unwrap_or_else(|| config.default_countries.clone()))
                .with_max_rank(max_rank)
                .with_scholarship(scholarship)
                .with_background(background);

            let collaborator = connect(&model, &config)?;
            let gateway = SearchGateway::new(collaborator.as_ref(), queries);

            println!("Searching for supervisors in {}...", criteria.countries);
            let bundle = gateway
                .search(&criteria)
                .map_err(|e| surface(e, SEARCH_FAILED))?;

            let heading = format!("Topic: {}", criteria.topic.trim());
            present(bundle, &view, &config, Some(&gateway), &criteria.topic, heading)?;
        }

        Commands::Network {
            name,
            institution,
            topic,
            view,
        } => {
            let collaborator = connect(&model, &config)?;
            let gateway = SearchGateway::new(collaborator.as_ref(), queries);

            println!("Searching network of {}...", name);
            let bundle = gateway
                .search_network(&name, &institution, &topic)
                .map_err(|e| surface(e, &network_failed(&name)))?;

            let heading = format!("Network of {}", name.trim());
            present(bundle, &view, &config, Some(&gateway), &topic, heading)?;
        }

        Commands::Parse { file, view } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read response file: {}", file.display()))?;
            let bundle = ResultBundle::new(parser::parse(&raw), Vec::new());

            // Network expansion from the browser needs a live model; parsing does not.
            let collaborator = if view.browse {
                connect(&model, &config)
                    .map_err(|e| tracing::debug!("network expansion unavailable: {:#}", e))
                    .ok()
            } else {
                None
            };
            let gateway = collaborator
                .as_deref()
                .map(|c| SearchGateway::new(c, queries));

            let heading = format!("Parsed: {}", file.display());
            present(bundle, &view, &config, gateway.as_ref(), "", heading)?;
        }
    }

    Ok(())
}

fn present(
    bundle: ResultBundle,
    view: &ViewArgs,
    config: &Config,
    gateway: Option<&SearchGateway>,
    topic: &str,
    mut heading: String,
) -> Result<()> {
    let mut presenter = ResultPresenter::new(bundle);
    presenter.set_filters(view.filters());
    let export_dir = view.export_dir(config);

    if view.browse {
        let browse_export_dir = export_dir.clone().unwrap_or_else(|| config.export_dir());
        loop {
            match tui::run_browse(&mut presenter, &heading, &browse_export_dir)? {
                BrowseOutcome::Quit => break,
                BrowseOutcome::Network(seed) => {
                    let Some(gateway) = gateway else {
                        println!("Network expansion needs a configured model; see --model.");
                        break;
                    };

                    presenter.clear();
                    println!("Searching network of {}...", seed.name);
                    let bundle = gateway
                        .search_network(&seed.name, &seed.university, topic)
                        .map_err(|e| surface(e, &network_failed(&seed.name)))?;
                    presenter.replace_bundle(bundle);
                    heading = format!("Network of {}", seed.name);
                }
            }
        }
    } else {
        let view_records = presenter.filtered_view();
        print!(
            "{}",
            render::render_results(
                &view_records,
                presenter.bundle().candidates.len(),
                &presenter.bundle().citations,
            )
        );
    }

    if let Some(dir) = export_dir {
        let view_records = presenter.filtered_view();
        println!("{}", export::export_summary(&view_records, &dir)?);
    }

    Ok(())
}

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use neuroquery::{Config, QueryResponse};

#[derive(Parser)]
#[command(name = "neuroquery")]
#[command(about = "Render NeuroQuery answers into structured blocks or HTML")]
struct Cli {
    /// Input file: raw message text, or a backend response with --json
    input: PathBuf,

    /// Treat the input as a backend query/chat response (JSON)
    #[arg(long)]
    json: bool,

    /// What to print
    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Config file (defaults to the bundled config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Segmented blocks as JSON
    Blocks,
    /// Blocks with inline spans as JSON
    Spans,
    /// HTML markup
    Html,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_existing(path)?,
        None => Config::compiled_default(),
    };

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("Error reading {}", cli.input.display()))?;

    let response = if cli.json {
        serde_json::from_str::<QueryResponse>(&input)
            .with_context(|| format!("Invalid response JSON in {}", cli.input.display()))?
    } else {
        QueryResponse {
            answer: input,
            citations: Vec::new(),
            faithfulness_score: None,
            refused: false,
        }
    };
    tracing::info!(
        bytes = response.answer.len(),
        citations = response.citations.len(),
        "rendering message"
    );

    let rendered = match cli.format {
        Format::Blocks => serde_json::to_string_pretty(&neuroquery::parse(&response.answer))?,
        Format::Spans => serde_json::to_string_pretty(&response.render())?,
        Format::Html => render_page(&response, &config),
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Error writing {}", path.display()))?;
            eprintln!("Created {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn render_page(response: &QueryResponse, config: &Config) -> String {
    let mut page = String::new();
    if response.faithfulness_score.is_some() || response.refused {
        let band = response.faithfulness(&config.faithfulness);
        let score = response.faithfulness_score.unwrap_or(0.0);
        page.push_str(&neuroquery::render_faithfulness(band, score));
    }
    page.push_str(&neuroquery::message_to_html_with_config(
        &response.answer,
        &response.citations,
        config,
    ));
    page
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

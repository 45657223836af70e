use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use quarry::metrics::SearchMetrics;
use quarry::{EngineConfig, QuarryError, SearchPage, SearchService};
use tracing::info;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Boolean query front-end for a full-text retrieval backend", long_about = None)]
struct Args {
    /// Vocabulary file, one term per line
    #[arg(long, env = "QUARRY_TERMS")]
    terms: PathBuf,

    /// Document metadata file (key, link, title, path; tab-separated)
    #[arg(long, env = "QUARRY_META")]
    meta: PathBuf,

    /// Named pipe the backend reads requests from
    #[arg(long, env = "QUARRY_REQUEST_PIPE", default_value = "../pipe_A")]
    request_pipe: PathBuf,

    /// Named pipe the backend writes responses to
    #[arg(long, env = "QUARRY_RESPONSE_PIPE", default_value = "../pipe_B")]
    response_pipe: PathBuf,

    /// Backend exchange timeout in milliseconds, 0 to wait forever
    #[arg(long, env = "QUARRY_TIMEOUT_MS", default_value = "5000")]
    timeout_ms: u64,

    /// Stem query and document words
    #[arg(long, env = "QUARRY_STEM")]
    stem: bool,

    /// Maximum snippet length in characters
    #[arg(long, env = "QUARRY_SNIPPET_LENGTH", default_value = "300")]
    snippet_length: usize,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics on exit
    #[arg(long)]
    metrics: bool,

    /// Zero-based result page
    #[arg(long, short, default_value = "0")]
    page: usize,

    /// Query to run; without it queries are read from stdin, one per line
    query: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting quarry v{}", quarry::VERSION);

    let config = EngineConfig::new(args.terms.clone(), args.meta.clone())
        .with_pipes(args.request_pipe.clone(), args.response_pipe.clone())
        .with_timeout_ms(args.timeout_ms)
        .with_stemming(args.stem)
        .with_snippet_length(args.snippet_length);

    let metrics = Arc::new(SearchMetrics::new().context("failed to register metrics")?);
    let service = SearchService::from_config(&config)
        .context("failed to start search service")?
        .with_metrics(metrics.clone());

    match &args.query {
        Some(query) => run_query(&service, query, args.page, args.json)?,
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = line?;
                let (query, page) = split_page(&line, args.page);
                if query.trim().is_empty() {
                    continue;
                }
                run_query(&service, query, page, args.json)?;
            }
        }
    }

    if args.metrics {
        eprint!("{}", metrics.render());
    }
    Ok(())
}

/// `query @N` selects page N in interactive mode
fn split_page(line: &str, default_page: usize) -> (&str, usize) {
    if let Some((query, page)) = line.rsplit_once(" @") {
        if let Ok(page) = page.trim().parse() {
            return (query, page);
        }
    }
    (line, default_page)
}

fn run_query(service: &SearchService, query: &str, page: usize, json: bool) -> Result<()> {
    let result = service.search(query, page);
    let mut out = io::stdout().lock();

    match result {
        Ok(found) if json => {
            serde_json::to_writer_pretty(&mut out, &found)?;
            writeln!(out)?;
        }
        Ok(found) => print_page(&mut out, &found)?,
        Err(e) if json => {
            let body = serde_json::json!({
                "error": e.kind(),
                "message": e.user_message(),
            });
            serde_json::to_writer_pretty(&mut out, &body)?;
            writeln!(out)?;
        }
        Err(e) => print_error(&mut out, &e)?,
    }
    Ok(())
}

fn print_page(out: &mut impl Write, found: &SearchPage) -> io::Result<()> {
    writeln!(out, "Query: {}  (page {})", found.query, found.page + 1)?;
    for hit in &found.hits {
        writeln!(out)?;
        match &hit.link {
            Some(link) => writeln!(out, "{}  <{}>", hit.title, link)?,
            None => writeln!(out, "{}", hit.title)?,
        }
        writeln!(out, "    {}", hit.snippet)?;
    }
    let pages: Vec<String> = found.pages.iter().map(|p| (p + 1).to_string()).collect();
    writeln!(out)?;
    writeln!(out, "Pages: {}", pages.join(" "))
}

fn print_error(out: &mut impl Write, error: &QuarryError) -> io::Result<()> {
    writeln!(out, "{}", error.user_message())?;
    if !error.is_local() {
        tracing::warn!(error = %error, "search failed");
    }
    Ok(())
}

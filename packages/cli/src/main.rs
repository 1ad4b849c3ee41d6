//! Command-line runner for the sourcing pipeline.
//!
//! Reads companies from flags or a JSON batch file, streams progress lines
//! while the run is in flight, and writes the reconciled assets as JSON.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pipeline_sourcing::{
    CompanyJob, CompanyResult, ContentCache, DuckDuckGoSearcher, HeadlessRenderer, OpenAi,
    SourcingConfig, SourcingPipeline, TieredFetcher,
};

#[derive(Parser)]
#[command(name = "sourcing", about = "Pharma pipeline sourcing over company websites")]
struct Cli {
    /// Directory holding cached page content
    #[arg(long, default_value = ".cache", global = true)]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract pipeline assets for one company or a batch file
    Run {
        /// Company name (single-company mode)
        #[arg(long, requires = "url")]
        company: Option<String>,

        /// Pipeline overview URL (single-company mode)
        #[arg(long, requires = "company")]
        url: Option<String>,

        /// JSON file with [{"company": ..., "url": ...}, ...]
        #[arg(long, conflicts_with_all = ["company", "url"])]
        input: Option<PathBuf>,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the web-search enrichment pass
        #[arg(long)]
        no_enrich: bool,

        /// Drop all cached page content before running
        #[arg(long)]
        fresh: bool,
    },

    /// Remove cached page content and report how many entries were removed
    ClearCache {
        /// Clear only this URL's entry
        #[arg(long)]
        url: Option<String>,
    },
}

/// One row of the JSON batch file.
#[derive(Debug, Deserialize)]
struct CompanyEntry {
    company: String,
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeline_sourcing=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = SourcingConfig::default().with_cache_dir(&cli.cache_dir);

    match cli.command {
        Commands::Run {
            company,
            url,
            input,
            output,
            no_enrich,
            fresh,
        } => {
            let jobs = load_jobs(company, url, input)?;
            if fresh {
                let removed =
                    ContentCache::new(&config.cache_dir, config.cache_ttl).clear(None)?;
                println!("Dropped {removed} cached entries");
            }
            let results = run_pipeline(jobs, config, no_enrich).await?;
            write_results(&results, output)
        }
        Commands::ClearCache { url } => {
            let cache = ContentCache::new(&config.cache_dir, config.cache_ttl);
            let removed = cache.clear(url.as_deref())?;
            println!("Removed {removed} cache entries");
            Ok(())
        }
    }
}

async fn run_pipeline(
    jobs: Vec<CompanyJob>,
    config: SourcingConfig,
    no_enrich: bool,
) -> Result<Vec<CompanyResult>> {
    let llm = OpenAi::from_env().context("OPENAI_API_KEY must be set")?;
    let fetcher =
        TieredFetcher::new(&config).with_renderer(Arc::new(HeadlessRenderer::new()));

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            println!("{event}");
        }
    });

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("stop requested; letting in-flight companies finish");
                stop.cancel();
            }
        });
    }

    let mut pipeline = SourcingPipeline::new(fetcher, llm, config)
        .with_progress(sender)
        .with_cancellation(stop);
    if !no_enrich {
        pipeline = pipeline.with_searcher(Arc::new(DuckDuckGoSearcher::new()));
    }

    let results = pipeline.run(jobs).await;
    drop(pipeline);
    printer.await?;
    Ok(results)
}

fn load_jobs(
    company: Option<String>,
    url: Option<String>,
    input: Option<PathBuf>,
) -> Result<Vec<CompanyJob>> {
    if let Some(path) = input {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let entries: Vec<CompanyEntry> = serde_json::from_str(&raw)
            .context("input must be a JSON array of {company, url} objects")?;
        if entries.is_empty() {
            bail!("no companies in {}", path.display());
        }
        return Ok(entries
            .into_iter()
            .map(|entry| CompanyJob::overview(entry.company, entry.url))
            .collect());
    }

    match (company, url) {
        (Some(company), Some(url)) => Ok(vec![CompanyJob::overview(company, url)]),
        _ => bail!("provide --company and --url, or --input <file>"),
    }
}

fn write_results(results: &[CompanyResult], output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    let total: usize = results.iter().map(|r| r.assets.len()).sum();
    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Wrote {total} assets across {} companies to {}",
                results.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_company_flags_build_one_job() {
        let jobs = load_jobs(
            Some("ABL Bio".to_string()),
            Some("https://ablbio.com/pipeline".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].company, "ABL Bio");
    }

    #[test]
    fn missing_flags_are_an_error() {
        assert!(load_jobs(None, None, None).is_err());
    }

    #[test]
    fn batch_file_parses_entries() {
        let dir = std::env::temp_dir().join("sourcing-cli-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("companies.json");
        fs::write(
            &path,
            r#"[{"company": "ABL Bio", "url": "https://ablbio.com/pipeline"},
                {"company": "Olix", "url": "https://olixpharma.com/pipeline"}]"#,
        )
        .unwrap();

        let jobs = load_jobs(None, None, Some(path)).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].company, "Olix");
    }
}

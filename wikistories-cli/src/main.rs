use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::MakeWriter, prelude::*, registry::LookupSpan,
};
use wikistories::{
    Article, ArticleCollection, LinkOptions, RevisionSpec, Site, Table, TimeRange,
    TimestampFormat,
};
use wikistories_config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Language edition, e.g. "de" (overrides conf/main.toml)
    #[arg(long, global = true)]
    language: Option<String>,
    /// Project, e.g. "wiktionary" (overrides conf/main.toml)
    #[arg(long, global = true)]
    project: Option<String>,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch revision histories and print them as one table
    Revisions {
        #[arg(required = true)]
        titles: Vec<String>,
        /// "all" or a maximum number of revisions per article
        #[arg(long, default_value = "all")]
        spec: RevisionSpec,
        /// Earliest revision timestamp (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Latest revision timestamp (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// wiki, isostring or unix
        #[arg(long, default_value = "isostring")]
        format: TimestampFormat,
        #[arg(long, value_enum, default_value_t = Output::Csv)]
        output: Output,
        /// Write the table here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Fetch all articles at once instead of one after another
        #[arg(long)]
        concurrent: bool,
    },
    /// List the pages an article links to
    Links {
        title: String,
        #[arg(long, default_value_t = 1)]
        depth: u8,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Csv,
    Json,
}

/// Human-readable log lines. Tables and link lists own stdout, so the console log goes to stderr.
fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer().with_target(false).with_writer(writer)
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = console_layer(std::io::stderr);
    let Some(path) = log_file else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return Ok(None);
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().context("--log-file must name a file")?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

fn load_config(language: Option<String>, project: Option<String>) -> Config {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Using default configuration: {e:#}");
        Config::default()
    });
    if let Some(language) = language {
        config.language = language;
    }
    if let Some(project) = project {
        config.project = project;
    }
    config
}

fn write_table(table: &Table, output: Output, mut sink: impl Write) -> anyhow::Result<()> {
    match output {
        Output::Csv => table.write_csv(sink)?,
        Output::Json => {
            serde_json::to_writer_pretty(&mut sink, table)?;
            writeln!(sink)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;
    let config = load_config(cli.language, cli.project);
    let site = Site::connect(&config).await?;

    match cli.command {
        Commands::Revisions {
            titles,
            spec,
            start,
            end,
            format,
            output,
            out,
            concurrent,
        } => {
            let mut collection = ArticleCollection::new(&site, titles)?;
            let range = TimeRange::new(start, end);
            if concurrent {
                collection.fetch_revisions_concurrently(spec, range).await?;
            } else {
                collection.fetch_revisions(spec, range).await?;
            }
            let table = collection.to_table(format)?;
            match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_table(&table, output, file)?;
                }
                None => write_table(&table, output, std::io::stdout().lock())?,
            }
        }
        Commands::Links { title, depth } => {
            let article = Article::new(&site, title);
            let linked = article
                .linked(LinkOptions::default().depth(depth).as_strings())
                .await?;
            for title in linked.titles() {
                println!("{title}");
            }
        }
    }
    Ok(())
}

use std::{num::NonZeroUsize, path::Path, process, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{filter::LevelFilter, fmt};

use swsearch::cli::{Cli, Commands, SearchFlags};
use swsearch::client::{HitRow, SearchOptions, SmallWorldClient};
use swsearch::config;
use swsearch::error::AppError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_level = determine_log_level(&cli);
    init_tracing(log_level);

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

fn determine_log_level(cli: &Cli) -> LevelFilter {
    match cli.verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let verbosity = cli.verbose;

    match cli.command {
        Some(Commands::Query(args)) => {
            run_search(args.smiles, args.flags, verbosity).await?;
        }
        Some(Commands::Batch(args)) => {
            let smiles = read_smiles_column(&args.input, &args.column)?;
            run_search(smiles, args.flags, verbosity).await?;
        }
        None => {
            Cli::print_help();
        }
    }

    Ok(())
}

async fn run_search(
    smiles: Vec<String>,
    flags: SearchFlags,
    verbosity: u8,
) -> Result<(), AppError> {
    let cfg = config::load()?;
    let base_url = flags.url.unwrap_or(cfg.api.base_url);
    let mut search = cfg.search;
    if let Some(db) = flags.db {
        search.db = db;
    }
    if let Some(dist) = flags.dist {
        search.dist = dist;
    }
    let workers = flags.workers.unwrap_or(cfg.runtime.workers).max(1);
    let worker_count = NonZeroUsize::new(workers).expect("workers must always be >= 1");

    tracing::info!(
        url = %base_url,
        db = %search.db,
        dist = search.dist,
        workers = worker_count.get(),
        structures = smiles.len(),
        "starting similarity search"
    );

    let client = SmallWorldClient::new(&base_url, search)?;
    let options = SearchOptions::builder()
        .worker_count(worker_count)
        .channel_capacity(cfg.runtime.channel_capacity)
        .build();

    let queried = smiles.len();
    let progress = (verbosity == 0).then(|| make_progress_bar(queried));
    let rows = client.search_many(smiles, options).await?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    print_rows(&rows, flags.pretty)?;
    eprintln!("found {} hits across {queried} structures", rows.len());
    Ok(())
}

fn make_progress_bar(queried: usize) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .expect("static progress template is valid"),
    );
    pb.set_message(format!("searching {queried} structures"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_rows(rows: &[HitRow], pretty: bool) -> Result<(), AppError> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn read_smiles_column(path: &Path, column: &str) -> Result<Vec<String>, AppError> {
    let file = std::fs::File::open(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?.clone();
    let Some(index) = headers.iter().position(|header| header == column) else {
        return Err(AppError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        });
    };

    let mut smiles = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            let value = value.trim();
            if !value.is_empty() {
                smiles.push(value.to_string());
            }
        }
    }

    if smiles.is_empty() {
        return Err(AppError::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    Ok(smiles)
}

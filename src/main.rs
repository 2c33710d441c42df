//! Carve CLI binary
//!
//! This is the main entry point for the carve command-line interface.
//! The CLI is a thin adapter over the library pipeline - NO logic is
//! implemented here.

use std::path::Path;
use std::process::ExitCode;

use carve::cache::DiskCache;
use carve::cli::Commands;
use carve::{CarveError, Pipeline};

fn main() -> ExitCode {
    let cli = carve::cli::parse_args();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let result = match cli.command {
        Commands::Check { config, repo } => execute_check(&config, repo.as_deref()),

        Commands::Split {
            config,
            repo,
            work_tree,
            dry_run,
        } => execute_split(&config, repo.as_deref(), &work_tree, dry_run),
    };

    match result {
        Ok(msg) => {
            println!("{msg}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::from(1)
        }
    }
}

/// Print an error, expanding aggregated API violations into one line per
/// finding.
fn report_error(err: &CarveError) {
    eprintln!("Error: {err}");
    if let CarveError::ApiViolation { errors } = err {
        for violation in errors {
            eprintln!(" - {}", violation.details());
        }
    }
}

/// The module root: explicit flag or the configuration file's directory.
fn repo_root<'a>(config_path: &'a Path, repo: Option<&'a Path>) -> &'a Path {
    match repo {
        Some(root) => root,
        None => {
            let parent = config_path.parent().unwrap_or(Path::new("."));
            if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            }
        }
    }
}

fn execute_check(config_path: &Path, repo: Option<&Path>) -> Result<String, CarveError> {
    let config = carve::config::load(config_path)?;
    let cache = DiskCache::open(repo_root(config_path, repo))?;

    let mut pipeline = Pipeline::new(&cache, &config)?;
    pipeline.check()?;

    Ok(format!(
        "The split configuration in {} is valid.",
        config_path.display()
    ))
}

fn execute_split(
    config_path: &Path,
    repo: Option<&Path>,
    work_tree: &Path,
    dry_run: bool,
) -> Result<String, CarveError> {
    let config = carve::config::load(config_path)?;
    let cache = DiskCache::open(repo_root(config_path, repo))?;

    let mut pipeline = Pipeline::new(&cache, &config)?;
    pipeline.split(work_tree)?;

    if dry_run {
        Ok(format!(
            "Dry run: split content staged under {} and left in place.",
            work_tree.display()
        ))
    } else {
        Ok(format!(
            "Split content written under {}. Publication to remotes is left to external tooling.",
            work_tree.display()
        ))
    }
}

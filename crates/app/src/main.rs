use anyhow::{Context, Result};
use bankin_import::{Classifier, FormatHint, ImportCoordinator, ImportSettings};
use bankin_storage::SqliteStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;

const API_KEY_ENV: &str = "BANKIN_DELEGATE_API_KEY";

#[derive(Parser)]
#[command(name = "bankin", version, about = "Import bank exports into the ledger")]
struct Cli {
    /// Settings file. Defaults to config.toml in the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger database. Defaults to ledger.db in the platform data directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Owner the imported records belong to.
    #[arg(long, global = true, default_value_t = 1)]
    owner: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage a bank export and print the batch as JSON. Nothing is stored.
    Preview {
        file: PathBuf,
        /// Column layout: "auto" or a known format key such as "toss".
        #[arg(long, default_value = "auto")]
        format: FormatHint,
        /// Sheet to read from a spreadsheet. Defaults to the first.
        #[arg(long)]
        sheet: Option<String>,
        /// Write the batch here instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Store the payload of a previewed batch ("-" reads stdin).
    Commit { batch: PathBuf },
}

pub struct AppState {
    pub coordinator: ImportCoordinator<SqliteStore>,
    pub owner: bankin_core::OwnerId,
    /// Where input files are copied before an import consumes them.
    pub uploads_dir: PathBuf,
}

fn load_settings(path: Option<PathBuf>, config_dir: &std::path::Path) -> Result<ImportSettings> {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (config_dir.join("config.toml"), false),
    };

    let mut settings = if explicit || path.exists() {
        ImportSettings::from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?
    } else {
        ImportSettings::default()
    };

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if let Some(delegate) = settings.delegate.as_mut() {
            delegate.api_key = Some(key);
        }
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let project_dirs = directories::ProjectDirs::from("com", "bankin", "Bankin")
        .context("Failed to get app directory")?;
    let data_dir = project_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    let settings = load_settings(cli.config, project_dirs.config_dir())?;
    let classifier = Classifier::from_settings(&settings).context("Failed to set up classifier")?;

    let db_path = cli.db.unwrap_or_else(|| data_dir.join("ledger.db"));
    let store = SqliteStore::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let uploads_dir = data_dir.join("uploads");
    std::fs::create_dir_all(&uploads_dir).context("Failed to create uploads directory")?;

    let state = AppState {
        coordinator: ImportCoordinator::new(Arc::new(store), classifier, settings),
        owner: bankin_core::OwnerId(cli.owner),
        uploads_dir,
    };

    match cli.command {
        Commands::Preview {
            file,
            format,
            sheet,
            out,
        } => commands::preview(&state, &file, format, sheet, out.as_deref()).await,
        Commands::Commit { batch } => commands::commit(&state, &batch).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_preview_flags() {
        let cli = Cli::try_parse_from([
            "bankin", "--owner", "3", "preview", "export.csv", "--format", "toss",
        ])
        .unwrap();
        assert_eq!(cli.owner, 3);
        match cli.command {
            Commands::Preview { file, format, .. } => {
                assert_eq!(file, PathBuf::from("export.csv"));
                assert_eq!(format, FormatHint::Known(bankin_import::KnownFormat::Toss));
            }
            Commands::Commit { .. } => panic!("expected preview"),
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["bankin", "preview", "x.csv", "--format", "kb"]).is_err());
    }

    #[test]
    fn missing_default_config_gives_defaults() {
        let dir = std::env::temp_dir().join("bankin-no-config");
        let settings = load_settings(None, &dir).unwrap();
        assert_eq!(settings, ImportSettings::default());
    }

    #[test]
    fn explicit_config_must_exist() {
        let missing = std::env::temp_dir().join("bankin-missing-config.toml");
        assert!(load_settings(Some(missing), std::path::Path::new("/")).is_err());
    }
}

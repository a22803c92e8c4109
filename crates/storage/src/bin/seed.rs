use std::fmt;
use std::path::PathBuf;

use quiz_core::model::{DisplayName, UserId, UserProfile};
use storage::catalog_file::CatalogFile;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    catalog: Option<PathBuf>,
    user: Option<(UserId, String)>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite://quiz.sqlite3?mode=rwc".into());
        let mut catalog = std::env::var("QUIZ_CATALOG").ok().map(PathBuf::from);
        let mut user_id = std::env::var("QUIZ_USER_ID").ok();
        let mut user_name = std::env::var("QUIZ_USER_NAME").ok();

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--catalog" => {
                    catalog = Some(PathBuf::from(require_value(&mut args, "--catalog")?));
                }
                "--user-id" => {
                    user_id = Some(require_value(&mut args, "--user-id")?);
                }
                "--user-name" => {
                    user_name = Some(require_value(&mut args, "--user-name")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let user = match user_id {
            Some(raw) => {
                let id = raw
                    .parse::<UserId>()
                    .map_err(|_| ArgsError::InvalidUserId { raw: raw.clone() })?;
                Some((id, user_name.unwrap_or_else(|| "Learner".into())))
            }
            None => None,
        };

        Ok(Self {
            db_url,
            catalog,
            user,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3?mode=rwc)");
    eprintln!("  --catalog <path>          Catalog JSON file (default: bundled sample)");
    eprintln!("  --user-id <uuid>          Also create a profile for this user");
    eprintln!("  --user-name <name>        Display name for --user-id (default: Learner)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATALOG, QUIZ_USER_ID, QUIZ_USER_NAME");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = match &args.catalog {
        Some(path) => CatalogFile::parse(&std::fs::read_to_string(path)?)?,
        None => CatalogFile::sample()?,
    };

    let storage = Storage::sqlite(&args.db_url).await?;
    catalog.import(storage.catalog.as_ref()).await?;

    if let Some((user_id, name)) = &args.user {
        let profile = UserProfile::new(*user_id, DisplayName::new(name.as_str())?);
        storage.profiles.upsert_profile(&profile).await?;
        println!("Created profile {} for {user_id}", profile.display_name.as_str());
    }

    println!(
        "Seeded {} units and {} questions into {}",
        catalog.units().len(),
        catalog.questions().len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

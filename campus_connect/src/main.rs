//! Campus Connect - CLI
//!
//! Browse the catalog and manage favorites behind the credential gate.

use std::path::PathBuf;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use campus_connect::{
    AppConfig, AuthAttempt, BiometryKind, CampusApp, CredentialFailure, FavoriteKind,
    Favoritable, LegacyFavorites, SimulatedDevice,
};

#[derive(Parser)]
#[command(name = "campus-connect")]
#[command(version = campus_connect::VERSION)]
#[command(about = "Campus Connect - communities, events and favorites")]
struct Cli {
    /// Data directory (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Biometry the simulated device reports
    #[arg(long, value_enum, default_value_t = BiometryArg::Face)]
    biometry: BiometryArg,

    /// Device has no passcode set
    #[arg(long)]
    no_passcode: bool,

    /// Make the first prompt fail with this reason
    #[arg(long, value_enum)]
    fail_with: Option<FailureArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BiometryArg {
    Face,
    Touch,
    None,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailureArg {
    Cancel,
    Lockout,
    NotEnrolled,
    System,
    Failed,
}

impl From<FailureArg> for CredentialFailure {
    fn from(arg: FailureArg) -> Self {
        match arg {
            FailureArg::Cancel => CredentialFailure::UserCancel,
            FailureArg::Lockout => CredentialFailure::BiometryLockout,
            FailureArg::NotEnrolled => CredentialFailure::BiometryNotEnrolled,
            FailureArg::System => CredentialFailure::SystemCancel,
            FailureArg::Failed => CredentialFailure::Failed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List communities
    Communities {
        /// Filter by name or tag
        #[arg(short, long)]
        search: Option<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// List events
    Events {
        /// Filter by title or tag
        #[arg(short, long)]
        search: Option<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a favorite
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Show favorites of a kind
    Favorites {
        /// community | event
        kind: FavoriteKind,
    },

    /// Show session and store status
    Status,

    /// Import a legacy favorites file
    ImportLegacy {
        /// JSON file with favoriteCommunityIds / favoriteEventIds
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    Add { kind: FavoriteKind, key: String },
    Remove { kind: FavoriteKind, key: String },
    Toggle { kind: FavoriteKind, key: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn build_device(cli: &Cli) -> SimulatedDevice {
    let mut device = SimulatedDevice::new().with_passcode(!cli.no_passcode);

    device = match cli.biometry {
        BiometryArg::Face => device.with_biometry(BiometryKind::FaceId),
        BiometryArg::Touch => device.with_biometry(BiometryKind::TouchId),
        BiometryArg::None => device,
    };

    if let Some(reason) = cli.fail_with {
        match reason {
            FailureArg::Lockout | FailureArg::NotEnrolled => {
                device = device.with_biometry_error(reason.into());
            }
            _ => device.push_outcome(Err(reason.into())),
        }
    }

    device
}

async fn unlock(app: &CampusApp<SimulatedDevice>) -> anyhow::Result<()> {
    let method = app.gate().check_availability();
    println!("🔐 {}...", method.prompt_label());

    match app.gate().authenticate(method).await {
        AuthAttempt::Authenticated => Ok(()),
        AuthAttempt::Rejected(failure) => {
            let message = app.gate().last_error().unwrap_or_default();
            if failure.suggests_passcode() {
                bail!("{} (retry using the device passcode)", message);
            }
            bail!("{}", message)
        }
        AuthAttempt::AlreadyInProgress => bail!("authentication already in progress"),
    }
}

fn resolve_key(app: &CampusApp<SimulatedDevice>, kind: FavoriteKind, key: &str) -> String {
    let id = match kind {
        FavoriteKind::Community => app.find_community(key).map(|c| c.favorite_id()),
        FavoriteKind::Event => app.find_event(key).map(|e| e.favorite_id()),
    };

    id.unwrap_or_else(|| {
        log::warn!("'{}' is not in the catalog, storing the key as given", key);
        key.to_string()
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_or_default(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let device = build_device(&cli);
    let app = CampusApp::open(config, device).context("failed to open favorites store")?;

    match cli.command {
        Commands::Communities { search, json } => {
            let found = app.search_communities(search.as_deref().unwrap_or(""));

            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                println!("👥 Communities ({}):", found.len());
                println!("{:-<60}", "");
                for c in found {
                    println!(
                        "{} - {} members [{}]",
                        c.name,
                        c.total_members(),
                        c.tags.join(", ")
                    );
                }
            }
        }

        Commands::Events { search, json } => {
            let found = app.search_events(search.as_deref().unwrap_or(""));

            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                println!("📅 Events ({}):", found.len());
                println!("{:-<60}", "");
                for e in found {
                    println!("{} {} @ {}", e.time, e.title, e.venue);
                }
            }
        }

        Commands::Favorite { action } => {
            unlock(&app).await?;
            let store = app.favorites()?;

            match action {
                FavoriteAction::Add { kind, key } => {
                    let key = resolve_key(&app, kind, &key);
                    store.add(&key, kind);
                    println!("⭐ Favorited {} {}", kind, key);
                }
                FavoriteAction::Remove { kind, key } => {
                    let id = resolve_key(&app, kind, &key);
                    store.remove(&id, kind);
                    store.remove(&key, kind);
                    println!("✅ Removed {} {}", kind, key);
                }
                FavoriteAction::Toggle { kind, key } => {
                    let key = resolve_key(&app, kind, &key);
                    let now = store.toggle(&key, kind);
                    println!("{} {} {}", if now { "⭐" } else { "  " }, kind, key);
                }
            }
        }

        Commands::Favorites { kind } => {
            unlock(&app).await?;

            let names: Vec<String> = match kind {
                FavoriteKind::Community => app
                    .favorite_communities()?
                    .into_iter()
                    .map(|c| c.name.clone())
                    .collect(),
                FavoriteKind::Event => app
                    .favorite_events()?
                    .into_iter()
                    .map(|e| e.title.clone())
                    .collect(),
            };

            if names.is_empty() {
                println!("📭 No favorite {}s", kind);
            } else {
                println!("⭐ Favorite {}s ({}):", kind, names.len());
                for name in names {
                    println!("   {}", name);
                }
            }
        }

        Commands::Status => {
            let method = app.gate().check_availability();
            println!("📊 Campus Connect {}", campus_connect::VERSION);
            println!("{:-<40}", "");
            println!("Credential method: {:?} ({})", method, method.icon_name());

            unlock(&app).await?;
            let session = app.session();
            let store = app.favorites()?;

            println!("Authenticated:     {}", session.is_authenticated);
            if let Some(at) = session.authenticated_at {
                println!("Since:             {}", at.to_rfc3339());
            }
            println!("Data dir:          {}", app.config().data_dir.display());
            println!("Communities:       {}", store.count(FavoriteKind::Community));
            println!("Events:            {}", store.count(FavoriteKind::Event));
        }

        Commands::ImportLegacy { file } => {
            unlock(&app).await?;

            let legacy = LegacyFavorites::load(&file)?
                .with_context(|| format!("{} does not exist", file.display()))?;
            let inserted = app.favorites()?.import_legacy(&legacy)?;
            let rekeyed = app.canonicalize_keys()?;

            println!("📥 Imported {} new favorites ({} re-keyed)", inserted, rekeyed);
        }
    }

    Ok(())
}

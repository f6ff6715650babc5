use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use solarhub::auth::{TokenGenerator, issue_token};
use solarhub::cli::prompts::{prompt_password, prompt_username};
use solarhub::cli::{
    AdminCommands, DB_FILE, UserCommands, run_info, run_user_add, run_user_list,
};
use solarhub::config::{ConfigOverrides, FileConfig, ServerConfig};
use solarhub::server::validation::{validate_password, validate_username};
use solarhub::server::{AppState, create_router};
use solarhub::store::{SqliteStore, Store};
use solarhub::types::ROLE_ADMIN;

const NOT_INITIALIZED: &str =
    "Server not initialized. Run 'solarhub admin init' first to create the database and an admin user.";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "solarhub")]
#[command(about = "A photo gallery server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(long, env = "SOLARHUB_HOST")]
        host: Option<String>,

        /// Port to bind to [default: 8000]
        #[arg(long, short, env = "SOLARHUB_PORT")]
        port: Option<u16>,

        /// Data directory for the database and stored images [default: ./data]
        #[arg(long, env = "SOLARHUB_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Public base URL for media links (e.g., "https://cdn.example.com/media").
        /// Defaults to the server's own /media route.
        #[arg(long, env = "SOLARHUB_PUBLIC_BASE_URL")]
        public_base_url: Option<String>,

        /// License text attached to photo detail responses
        #[arg(long, env = "SOLARHUB_LICENSE")]
        license: Option<String>,

        /// Allowed CORS origins; any origin is allowed when none are given
        #[arg(long = "cors-origin", env = "SOLARHUB_CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,

        /// TOML config file; command line flags take precedence
        #[arg(long, env = "SOLARHUB_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn run_init(
    data_dir: String,
    username: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let data_path = PathBuf::from(data_dir);
    fs::create_dir_all(&data_path)?;
    fs::create_dir_all(data_path.join("objects"))?;

    let store = SqliteStore::new(data_path.join(DB_FILE))?;
    store.initialize()?;

    let token_file = data_path.join(".admin_token");

    if store.has_admin_user()? {
        bail!(
            "Server already initialized. An admin user exists in {}",
            data_path.join(DB_FILE).display()
        );
    }

    let username = match username {
        Some(name) => {
            validate_username(&name).map_err(|e| anyhow::anyhow!(e.message))?;
            name
        }
        None if non_interactive => ROLE_ADMIN.to_string(),
        None => prompt_username(Some(ROLE_ADMIN))?,
    };

    let password = match password {
        Some(password) => {
            validate_password(&password).map_err(|e| anyhow::anyhow!(e.message))?;
            password
        }
        None if non_interactive => {
            bail!("--password (or SOLARHUB_ADMIN_PASSWORD) is required in non-interactive mode")
        }
        None => prompt_password()?,
    };

    let password_hash = TokenGenerator::new().hash(&password)?;
    let user = store.create_user(&username, &password_hash, ROLE_ADMIN)?;
    let (_, raw_token) = issue_token(&store, user.id, None)?;

    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Created admin user '{}'", user.username);
    println!();
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

async fn run_serve(overrides: ConfigOverrides, config_file: Option<PathBuf>) -> anyhow::Result<()> {
    let file = match config_file {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };
    let config = ServerConfig::resolve(overrides, file);

    let db_path = config.db_path();
    if !db_path.exists() {
        bail!(NOT_INITIALIZED);
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    if !store.has_admin_user()? {
        bail!(NOT_INITIALIZED);
    }

    fs::create_dir_all(config.objects_dir())?;

    let addr = config.socket_addr()?;
    info!("Serving media from {}", config.media_base_url());

    let state = Arc::new(AppState::new(Arc::new(store), config));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("solarhub=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                username,
                password,
                non_interactive,
            } => {
                run_init(data_dir, username, password, non_interactive)?;
            }
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    username,
                    password,
                    role,
                    create_token,
                    non_interactive,
                } => {
                    run_user_add(
                        data_dir,
                        username,
                        password,
                        role,
                        create_token,
                        non_interactive,
                    )?;
                }
                UserCommands::List { data_dir, json } => {
                    run_user_list(data_dir, json)?;
                }
            },
            AdminCommands::Info { data_dir, json } => {
                run_info(data_dir, json)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
            license,
            cors_origins,
            config,
        } => {
            let overrides = ConfigOverrides {
                host,
                port,
                data_dir,
                public_base_url,
                license,
                cors_origins,
            };
            run_serve(overrides, config).await?;
        }
    }

    Ok(())
}

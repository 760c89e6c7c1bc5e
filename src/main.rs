use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use filigrane::{
    Config, create_app,
    database::{Database, NewUser, UserRepo},
    login::{LoginError, SignupRequest, password},
    startup_checks,
};

const USER_PASSWORD_ENV: &str = "FILIGRANE_USER_PASSWORD";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage accounts in the configured database
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// List all accounts
    List,
    /// Create an account. The password (at least 8 characters) is taken from
    /// FILIGRANE_USER_PASSWORD, or read from stdin when that is unset.
    Add {
        /// Display name, also used in the default watermark text
        name: String,
        /// Email address (stored lowercased)
        email: String,
    },
    /// Delete an account and its watermark texts
    Remove {
        /// Email of the account to remove
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    }
    .with_env_overrides();

    // --log-level beats the config file
    let log_level = cli.log_level.as_deref().unwrap_or(&config.app.log_level);
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !cli.config.exists() {
        info!("Config file not found at {:?}, using defaults", cli.config);
    }

    match cli.command {
        Some(Commands::User(user_cmd)) => handle_user_command(&config, user_cmd).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, cli.config, port, host, quit_after).await,
        None => run_server(config, cli.config, None, None, None).await,
    }
}

async fn handle_user_command(
    config: &Config,
    cmd: UserCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database.path).await?;

    match cmd {
        UserCommands::List => {
            let users = UserRepo::list(db.pool()).await?;
            if users.is_empty() {
                println!("No users in database");
            } else {
                println!("Users in database:");
                for user in &users {
                    println!(
                        "  {} <{}> created {}",
                        user.name,
                        user.email,
                        user.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
        UserCommands::Add { name, email } => {
            let plain_password = read_password(
                std::env::var(USER_PASSWORD_ENV).ok(),
                &mut std::io::stdin().lock(),
            )?;
            let request = SignupRequest {
                name,
                email,
                password: plain_password,
            }
            .normalized()?;

            if UserRepo::find_by_email(db.pool(), &request.email)
                .await?
                .is_some()
            {
                eprintln!("Error: User '{}' already exists", request.email);
                db.close().await;
                std::process::exit(1);
            }

            let password_hash =
                password::hash_password(&request.password).map_err(LoginError::from)?;
            let user = UserRepo::create(
                db.pool(),
                &NewUser {
                    name: request.name,
                    email: request.email,
                    password_hash,
                },
            )
            .await?;
            println!("Added user '{}' <{}>", user.name, user.email);
        }
        UserCommands::Remove { email } => {
            let email = email.trim().to_lowercase();
            if UserRepo::delete_by_email(db.pool(), &email).await? {
                println!("Removed user '{}'", email);
            } else {
                eprintln!("Error: User '{}' not found", email);
                db.close().await;
                std::process::exit(1);
            }
        }
    }

    db.close().await;
    Ok(())
}

async fn run_server(
    config: Config,
    config_path: PathBuf,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Database: {:?}", config.database.path);
    info!("Template directory: {:?}", config.templates.directory);
    info!(
        "Static files directory: {:?}",
        config.static_files.directory
    );

    if let Err(errors) = startup_checks::perform_startup_checks(&config).await {
        for error in &errors {
            tracing::error!("Startup check failed: {}", error);
        }

        if errors.iter().any(|e| e.is_critical()) {
            tracing::error!("Critical startup check failed, exiting");
            return Err("Critical startup check failed".into());
        }
        tracing::warn!("Non-critical startup checks failed, continuing");
    }

    let database = Database::connect(&config.database.path).await?;
    let app = create_app(config, database.clone()).await;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Shutting down - closing database");
    database.close().await;

    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}

/// Password for `user add`: the environment value if set, else one line from `input`
fn read_password(from_env: Option<String>, input: &mut impl BufRead) -> std::io::Result<String> {
    if let Some(password) = from_env.filter(|p| !p.is_empty()) {
        return Ok(password);
    }

    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

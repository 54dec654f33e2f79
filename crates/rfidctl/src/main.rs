mod config;
mod messages;
mod render;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use config::{Config, Context};
use messages::{describe, Flow};
use rfid_client::models::{ReadingFilter, RegisterRequest};
use rfid_client::services::validate_registration;
use rfid_client::{
    ApiClient, ApiError, AuthService, ClientConfig, DashboardService, FileStorage, PollUpdate,
    Session, SessionEvent, StatsPoller,
};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_FAILURE: i32 = 1;
const EXIT_LOGIN_REQUIRED: i32 = 2;

#[derive(Parser)]
#[command(name = "rfidctl")]
#[command(version, about = "RFID livestock monitoring dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend API URL (overrides RFID_API_URL and the current context)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    /// Examples:
    ///     rfidctl login -u joao
    ///     rfidctl login -u joao -p secret1
    #[command(verbatim_doc_comment)]
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (falls back to RFID_PASSWORD, then a prompt)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create a new user account
    /// Examples:
    ///     rfidctl register -u maria -p secret1 --confirm-password secret1 --name "Maria Souza"
    #[command(verbatim_doc_comment)]
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: Option<String>,

        /// Repeat the password
        #[arg(long)]
        confirm_password: Option<String>,

        /// Full name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Check that the backend is up
    Status {
        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Show dashboard statistics
    /// Examples:
    ///     rfidctl dashboard
    ///     rfidctl dashboard --watch
    ///     rfidctl dashboard --json
    #[command(verbatim_doc_comment)]
    Dashboard {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Emit only the JSON response
        #[arg(short, long, conflicts_with = "watch")]
        json: bool,
    },
    /// List readings, optionally filtered
    /// Examples:
    ///     rfidctl readings
    ///     rfidctl readings --zone 2 --type Vaquinha
    #[command(verbatim_doc_comment)]
    Readings {
        #[arg(short, long)]
        zone: Option<i64>,

        /// Animal type
        #[arg(short = 't', long = "type")]
        animal_type: Option<String>,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Statistics for one zone
    Zone {
        zone_id: i64,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Context management
    Context {
        #[command(subcommand)]
        command: ContextCommand,
    },
}

#[derive(Subcommand)]
enum ContextCommand {
    /// Add a named backend
    Add {
        name: String,
        api_url: String,

        /// Make it the current context
        #[arg(long)]
        set_current: bool,
    },
    /// List contexts
    List,
    /// Switch the current context
    Use { name: String },
    /// Show the current context
    Current,
    /// Delete a context
    Delete { name: String },
}

/// A guarded command was invoked without a session.
#[derive(Debug)]
struct LoginRequired;

impl fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(messages::NOT_LOGGED_IN)
    }
}

impl std::error::Error for LoginRequired {}

/// The backend invalidated the session while a command was running.
#[derive(Debug)]
struct SessionExpired;

impl fmt::Display for SessionExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(messages::SESSION_EXPIRED)
    }
}

impl std::error::Error for SessionExpired {}

/// Session, services and resolved configuration for one invocation.
struct App {
    config: ClientConfig,
    session: Arc<Session>,
    auth: AuthService,
    dashboard: DashboardService,
}

impl App {
    fn new(config: ClientConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(config.credentials_path()));
        let session = Session::with_storage(storage);
        let client = ApiClient::new(&config, Arc::clone(&session))
            .context("Failed to create API client")?;

        Ok(Self {
            auth: AuthService::new(client.clone()),
            dashboard: DashboardService::new(client),
            session,
            config,
        })
    }

    /// Route guard for commands that need a token.
    fn require_login(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(LoginRequired.into())
        }
    }
}

/// Listens to session events and turns an expiry into the login redirect.
struct Shell {
    events: broadcast::Receiver<SessionEvent>,
}

impl Shell {
    fn new(session: &Session) -> Self {
        Self {
            events: session.subscribe(),
        }
    }

    /// Drain pending events; true if the session expired.
    fn session_expired(&mut self) -> bool {
        let mut expired = false;
        while let Ok(event) = self.events.try_recv() {
            if event == SessionEvent::Expired {
                expired = true;
            }
        }
        expired
    }

    fn finish(mut self, result: Result<()>) {
        let Err(err) = result else {
            return;
        };

        if err.is::<SessionExpired>() || self.session_expired() {
            eprintln!("{}", messages::SESSION_EXPIRED);
            std::process::exit(EXIT_LOGIN_REQUIRED);
        }
        if err.is::<LoginRequired>() {
            eprintln!("{}", err);
            std::process::exit(EXIT_LOGIN_REQUIRED);
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(EXIT_FAILURE);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ClientConfig::from_env()?;
    let mut contexts = Config::load(&config.home)?;

    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url);
    } else if std::env::var_os("RFID_API_URL").is_none() {
        if let Some((name, ctx)) = contexts.get_current_context() {
            tracing::debug!(context = %name, api_url = %ctx.api_url, "Using context");
            config = config.with_api_url(&ctx.api_url);
        }
    }

    if let Some(Commands::Context { command }) = cli.command {
        return handle_context_command(&mut contexts, command);
    }

    let app = App::new(config)?;
    let shell = Shell::new(&app.session);

    let result = match cli.command {
        None => home(&app).await,
        Some(Commands::Login { username, password }) => login(&app, &username, password).await,
        Some(Commands::Register {
            username,
            password,
            confirm_password,
            name,
            email,
        }) => register(&app, username, password, confirm_password, name, email).await,
        Some(Commands::Logout) => logout(&app),
        Some(Commands::Whoami) => whoami(&app),
        Some(Commands::Status { json }) => status(&app, json).await,
        Some(Commands::Dashboard { watch: true, .. }) => watch_dashboard(&app).await,
        Some(Commands::Dashboard { json, .. }) => show_dashboard(&app, json).await,
        Some(Commands::Readings {
            zone,
            animal_type,
            json,
        }) => list_readings(&app, zone, animal_type, json).await,
        Some(Commands::Zone { zone_id, json }) => zone_statistics(&app, zone_id, json).await,
        Some(Commands::Context { .. }) => unreachable!("handled above"),
    };

    shell.finish(result);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn session_error(err: ApiError) -> anyhow::Error {
    anyhow!(describe(Flow::Session, &err))
}

fn read_secret(prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// No subcommand: dashboard when logged in, otherwise the login hint.
async fn home(app: &App) -> Result<()> {
    app.require_login()?;
    show_dashboard(app, false).await
}

async fn login(app: &App, username: &str, password: Option<String>) -> Result<()> {
    if app.session.is_authenticated() {
        match app.session.user() {
            Some(user) => println!(
                "Already logged in as {}. Run `rfidctl logout` to switch users.",
                user.display_name()
            ),
            None => println!(
                "Already logged in (no profile stored). Run `rfidctl logout` to switch users."
            ),
        }
        return Ok(());
    }

    let password = match password.or_else(|| std::env::var("RFID_PASSWORD").ok()) {
        Some(p) => p,
        None => read_secret("Password: ")?,
    };

    match app.auth.login(username, &password).await {
        Ok(response) => {
            println!("Logged in as {}.", response.profile().display_name());
            Ok(())
        }
        Err(e) => Err(anyhow!(describe(Flow::Login, &e))),
    }
}

async fn register(
    app: &App,
    username: String,
    password: Option<String>,
    confirm_password: Option<String>,
    name: Option<String>,
    email: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_secret("Password: ")?,
    };
    let confirmation = match confirm_password {
        Some(p) => p,
        None => read_secret("Confirm password: ")?,
    };
    validate_registration(&username, &password, &confirmation)?;

    let request = RegisterRequest {
        username: username.trim().to_string(),
        password,
        full_name: name.filter(|n| !n.trim().is_empty()),
        email: email.filter(|e| !e.trim().is_empty()),
    };

    match app.auth.register(&request).await {
        Ok(response) => {
            println!(
                "User '{}' created. Log in with `rfidctl login -u {}`.",
                response.username, response.username
            );
            Ok(())
        }
        Err(e) => Err(anyhow!(describe(Flow::Register, &e))),
    }
}

fn logout(app: &App) -> Result<()> {
    if app.auth.logout().context("Failed to clear stored credentials")? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn whoami(app: &App) -> Result<()> {
    app.require_login()?;
    match app.session.user() {
        Some(user) => {
            println!("Username:  {}", user.username);
            if let Some(name) = &user.full_name {
                println!("Full name: {}", name);
            }
            if let Some(email) = &user.email {
                println!("Email:     {}", email);
            }
        }
        None => println!("Logged in (no profile stored)."),
    }
    println!("Server:    {}", app.config.api_url);
    Ok(())
}

async fn status(app: &App, json: bool) -> Result<()> {
    let status = app
        .dashboard
        .server_status()
        .await
        .map_err(|e| anyhow!(describe(Flow::Status, &e)))?;
    if json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        print!("{}", render::server_status(&status, &app.config.api_url));
    }
    Ok(())
}

async fn show_dashboard(app: &App, json: bool) -> Result<()> {
    app.require_login()?;
    let stats = app.dashboard.get_stats().await.map_err(session_error)?;
    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        print!("{}", render::dashboard(&stats, app.session.user().as_ref()));
    }
    Ok(())
}

async fn watch_dashboard(app: &App) -> Result<()> {
    app.require_login()?;

    let user = app.session.user();
    let interval = app.config.poll_interval;
    let mut events = app.session.subscribe();
    let poller = StatsPoller::for_service(app.dashboard.clone(), interval);
    let mut updates = poller.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let update = updates.borrow_and_update().clone();
                match update {
                    PollUpdate::Pending => {}
                    PollUpdate::Snapshot(stats) => {
                        print!("\x1b[2J\x1b[H");
                        print!("{}", render::dashboard(&stats, user.as_ref()));
                        println!(
                            "\nRefreshing every {}s. Press Ctrl+C to exit.",
                            interval.as_secs()
                        );
                        io::stdout().flush()?;
                    }
                    // Expiry arrives as a session event.
                    PollUpdate::Failed(e) if e.is_unauthorized() => {}
                    PollUpdate::Failed(e) => {
                        eprintln!("Failed to load dashboard data: {}", describe(Flow::Session, &e));
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(SessionEvent::Expired) => {
                        poller.stop();
                        return Err(SessionExpired.into());
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                poller.stop();
                println!();
                return Ok(());
            }
        }
    }
}

async fn list_readings(
    app: &App,
    zone: Option<i64>,
    animal_type: Option<String>,
    json: bool,
) -> Result<()> {
    app.require_login()?;
    let filter = ReadingFilter { zone, animal_type };
    let readings = app
        .dashboard
        .get_readings(&filter)
        .await
        .map_err(session_error)?;
    if json {
        println!("{}", serde_json::to_string(&readings)?);
    } else {
        print!("{}", render::readings(&readings));
    }
    Ok(())
}

async fn zone_statistics(app: &App, zone_id: i64, json: bool) -> Result<()> {
    app.require_login()?;
    let stats = app
        .dashboard
        .get_zone_statistics(zone_id)
        .await
        .map_err(session_error)?;
    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        print!("{}", render::zone_statistics(&stats));
    }
    Ok(())
}

fn handle_context_command(config: &mut Config, command: ContextCommand) -> Result<()> {
    match command {
        ContextCommand::Add {
            name,
            api_url,
            set_current,
        } => {
            let api_url = rfid_client::config::normalize_api_url(&api_url);
            if !rfid_client::config::is_valid_api_url(&api_url) {
                eprintln!("Invalid API URL '{}'.", api_url);
                std::process::exit(EXIT_FAILURE);
            }
            config.contexts.insert(name.clone(), Context { api_url });
            if set_current || config.current_context.is_none() {
                config.current_context = Some(name.clone());
            }
            config.save()?;
            println!("Context '{}' added.", name);
            if config.current_context.as_ref() == Some(&name) {
                println!("Context '{}' is now the current context.", name);
            }
        }
        ContextCommand::List => {
            println!("  {:<15} {:<40}", "NAME", "API URL");
            for (name, ctx) in &config.contexts {
                let current_mark = if config.current_context.as_ref() == Some(name) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<15} {:<40}", current_mark, name, ctx.api_url);
            }
        }
        ContextCommand::Use { name } => {
            if config.contexts.contains_key(&name) {
                config.current_context = Some(name.clone());
                config.save()?;
                println!("Switched to context '{}'.", name);
            } else {
                eprintln!("Context '{}' not found.", name);
                std::process::exit(EXIT_FAILURE);
            }
        }
        ContextCommand::Delete { name } => {
            if config.contexts.remove(&name).is_some() {
                if config.current_context.as_ref() == Some(&name) {
                    config.current_context = None;
                }
                config.save()?;
                println!("Context '{}' deleted.", name);
            } else {
                eprintln!("Context '{}' not found.", name);
                std::process::exit(EXIT_FAILURE);
            }
        }
        ContextCommand::Current => {
            if let Some((name, ctx)) = config.get_current_context() {
                println!("Current context: {}", name);
                println!("  API URL: {}", ctx.api_url);
            } else {
                println!("No current context set.");
            }
        }
    }
    Ok(())
}

//! Command line front-end for the HR portal session.
//!
//! Keeps the session in a file so consecutive invocations behave like
//! reloads of the portal.

use clap::{Parser, Subcommand};
use hr_session::{
    AppRouter, AuthError, ConfigBuilder, FileSessionStore, HttpAuthProvider, MemoryHistory,
    Resolution, SessionConfig, SessionManager,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Router = AppRouter<FileSessionStore, HttpAuthProvider, MemoryHistory>;

#[derive(Parser)]
#[command(name = "hr-session")]
#[command(about = "HR portal session - sign in, sign out and check route access")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "HR_SESSION_CONFIG", default_value = "hr-session.toml")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in as an employee
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the restored session
    Status,
    /// Resolve a portal path the way the browser shell would
    Visit { path: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        let message = e
            .user_message()
            .map(str::to_string)
            .unwrap_or_else(|| e.to_string());
        eprintln!("ERROR: {message}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "hr_session=debug" } else { "hr_session=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_router(config: SessionConfig) -> Result<Router, AuthError> {
    let path = config
        .storage
        .path
        .clone()
        .unwrap_or_else(FileSessionStore::default_path);
    tracing::debug!(path = %path.display(), "Using session file");

    let store = FileSessionStore::new(path);
    let provider = HttpAuthProvider::new(&config.provider)?;
    let manager = Arc::new(SessionManager::new(store, provider, config));
    Ok(AppRouter::new(manager, MemoryHistory::new()))
}

async fn run(args: Args) -> Result<(), AuthError> {
    let config = ConfigBuilder::new().with_file(&args.config, false).build()?;
    let router = build_router(config)?;

    let outcome = router.start().await;
    if let Some(redirect) = &outcome.redirect {
        println!("Stored session was not eligible; redirected to {}", redirect.target_path);
    }

    match args.command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ").map_err(|e| {
                    AuthError::configuration(format!("failed to read password: {e}"))
                })?,
            };
            let resolution = router.login(&email, &password).await?;
            println!("Signed in as {email}");
            print_resolution(&router, &resolution);
        }
        Command::Logout => {
            let resolution = router.logout().await;
            println!("Signed out");
            print_resolution(&router, &resolution);
        }
        Command::Status => {
            let state = router.manager().state();
            match state.user() {
                Some(user) => {
                    let name = user.display_name().unwrap_or_default();
                    println!("Signed in: {name}");
                    println!("Role: {}", state.role().unwrap_or("-"));
                    println!("Organization: {}", state.organization_id().unwrap_or("-"));
                }
                None => println!("Signed out"),
            }
            if let Some(role) = router.manager().effective_role().await {
                tracing::debug!(%role, "Effective role");
            }
        }
        Command::Visit { path } => {
            let resolution = router.visit(&path);
            print_resolution(&router, &resolution);
        }
    }
    Ok(())
}

fn print_resolution(router: &Router, resolution: &Resolution) {
    let at = router.navigator().current_path().unwrap_or_default();
    match resolution {
        Resolution::Render { view, params } if params.is_empty() => {
            println!("{at} -> {view}");
        }
        Resolution::Render { view, params } => {
            let mut params: Vec<_> = params.iter().collect();
            params.sort();
            let params: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("{at} -> {view} ({})", params.join(", "));
        }
        Resolution::Waiting => println!("{at} -> waiting for session"),
        Resolution::Redirect(intent) => println!("{at} -> redirect loop at {}", intent.target_path),
    }
    if let Some(current) = router.navigator().current() {
        if current.access_denied {
            let from = current.from_path.as_deref().unwrap_or("-");
            println!("Access denied for {from}; please sign in as an employee");
        }
    }
}

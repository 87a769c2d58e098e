use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use mate_session::config::{AppConfig, ConfigError};
use mate_session::provider::ProfileError;
use mate_session::provider::memory::{MemoryIdentityProvider, MemoryProfileStore};
use mate_session::routing::{Navigator, Route, spawn_route_guard};
use mate_session::services::account::{AccountService, AuthFailure, SubmitOutcome};
use mate_session::services::credentials::AuthForm;
use mate_session::session::{SessionController, SessionError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("auth failed: {0}")]
    Auth(#[from] AuthFailure),
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
    #[error("route guard failed: {0}")]
    Guard(#[from] tokio::task::JoinError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "mate-session", about = "MATE session-state walkthrough against the in-memory backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration.
    Config,
    /// Sign up, sign out and sign back in while printing every navigation.
    Walkthrough(WalkthroughArgs),
}

#[derive(Args, Debug)]
struct WalkthroughArgs {
    #[arg(long, default_value = "guest@mate.app")]
    email: String,

    #[arg(long, default_value = "mate-demo")]
    password: String,

    /// Defaults to `--password`.
    #[arg(long)]
    confirm: Option<String>,

    #[arg(long)]
    display_name: Option<String>,

    /// Make the profile store reject writes.
    #[arg(long)]
    fail_profile_write: bool,

    /// Start with the identity provider unreachable.
    #[arg(long)]
    offline: bool,
}

struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn replace(&self, route: Route) {
        println!("navigate -> {} ({route:?})", route.path());
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = AppConfig::from_env()?;
    match cli.command {
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Command::Walkthrough(args) => walkthrough(config, args).await,
    }
}

async fn walkthrough(config: AppConfig, args: WalkthroughArgs) -> Result<(), CliError> {
    let identity = MemoryIdentityProvider::new(config.auth, config.sign_in_limit);
    let profiles = MemoryProfileStore::new();
    identity.set_offline(args.offline);
    profiles.set_fail_writes(args.fail_profile_write);
    let service = AccountService::new(Arc::new(identity.clone()), Arc::new(profiles.clone()), config.auth);

    let mut controller = SessionController::new();
    let guard = spawn_route_guard(controller.transitions(), Arc::new(StdoutNavigator), config.routing.loading_timeout);

    if let Err(e) = controller.start(&identity) {
        println!("session stays {}: {e}", controller.state().status());
        controller.stop();
        guard.await?;
        return Err(e.into());
    }

    let confirm = args.confirm.as_deref().unwrap_or(&args.password);
    let mut form = AuthForm::sign_up(&args.email, &args.password, confirm);
    if let Some(name) = &args.display_name {
        form = form.with_display_name(name);
    }

    match service.submit(&form).await {
        Ok(SubmitOutcome::SignedUp(outcome)) => {
            println!("profile: {}", serde_json::to_string_pretty(&outcome.profile)?);
            if let Some(warning) = outcome.warning_message() {
                println!("warning: {warning}");
            }
        }
        Ok(SubmitOutcome::SignedIn(principal)) => println!("signed in as {}", principal.email),
        Err(e) => {
            println!("sign-up failed: {}", e.user_message());
            controller.stop();
            guard.await?;
            return Err(e.into());
        }
    }

    service.sign_out().await?;
    let principal = service.sign_in(&AuthForm::sign_in(&args.email, &args.password)).await?;
    if let Some(profile) = service.profile(&principal).await? {
        println!("welcome back, {}", profile.display_name);
    }
    println!("state: {}", serde_json::to_string(&controller.state())?);

    controller.stop();
    guard.await?;
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use labnose_profile::api::{HttpProfileApi, ProfileError, SignupPayload};
use labnose_profile::config::{ConfigError, ProfileConfig};
use labnose_profile::notify::TracingNotifier;
use labnose_profile::provision::{
    FileProvisionLedger, LedgerError, MemoryProvisionLedger, NavigationState, PROFILE_PAGE_PATH, ProvisionLedger,
    ProvisionOutcome,
};
use labnose_profile::session::{PageState, Session, SessionUser, StaticTokenProvider};
use labnose_profile::{ProfileSyncController, view};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("profile request failed: {0}")]
    Profile(#[from] ProfileError),
    #[error("provisioning ledger failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("invalid signup JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not logged in; set PROFILE_USER_EMAIL and an access token")]
    NotAuthenticated,
    #[error("provisioning failed")]
    ProvisioningFailed,
}

#[derive(Parser, Debug)]
#[command(name = "labnose-profile", about = "LabNose user profile client")]
struct Cli {
    /// Overrides `PROFILE_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "PROFILE_USER_NAME", default_value = "")]
    user_name: String,

    #[arg(long, env = "PROFILE_USER_EMAIL")]
    user_email: Option<String>,

    /// Overrides `PROFILE_LEDGER_PATH`.
    #[arg(long)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and print the profile page.
    Show,
    /// Edit and save the profile.
    Save {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        device_id: Option<String>,
    },
    /// Forward signup data gathered during the OAuth redirect.
    Provision {
        /// JSON object with the signup fields.
        #[arg(long)]
        signup_data: String,
        #[arg(long, default_value = PROFILE_PAGE_PATH)]
        return_to: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Logs and toasts go to stderr so stdout stays the rendered page.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ProfileConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    if let Some(path) = cli.ledger {
        config.ledger_path = Some(path);
    }

    let tokens = StaticTokenProvider::new(config.access_token.clone());
    let session = build_session(&cli.user_name, cli.user_email.as_deref(), tokens.has_token());
    let ledger: Arc<dyn ProvisionLedger> = match &config.ledger_path {
        Some(path) => Arc::new(FileProvisionLedger::open(path)?),
        None => Arc::new(MemoryProvisionLedger::new()),
    };
    let controller = ProfileSyncController::new(
        Arc::new(HttpProfileApi::from_config(&config)?),
        Arc::new(tokens),
        Arc::new(TracingNotifier),
        ledger,
    );

    match cli.command {
        Command::Show => run_show(&controller, &session).await,
        Command::Save { name, device_id } => run_save(&controller, &session, name, device_id).await,
        Command::Provision { signup_data, return_to } => {
            run_provision(&controller, &session, &signup_data, return_to).await
        }
    }
}

/// The CLI is logged in when it has both an email and a bearer token.
fn build_session(name: &str, email: Option<&str>, has_token: bool) -> Session {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) if has_token => {
            Session::authenticated(SessionUser { name: name.to_string(), email: email.to_string() })
        }
        _ => Session::anonymous(),
    }
}

async fn print_page(controller: &ProfileSyncController, session: &Session) {
    println!("{}", view::render(&PageState::from(session), &controller.form().await));
}

async fn run_show(controller: &ProfileSyncController, session: &Session) -> Result<(), CliError> {
    controller.initialize(session).await;
    print_page(controller, session).await;
    Ok(())
}

async fn run_save(
    controller: &ProfileSyncController,
    session: &Session,
    name: Option<String>,
    device_id: Option<String>,
) -> Result<(), CliError> {
    if !controller.initialize(session).await {
        print_page(controller, session).await;
        return Err(CliError::NotAuthenticated);
    }
    if let Some(name) = name {
        controller.set_name(name).await;
    }
    if let Some(device_id) = device_id {
        controller.set_device_id(device_id).await;
    }
    controller.save_profile().await?;
    print_page(controller, session).await;
    Ok(())
}

async fn run_provision(
    controller: &ProfileSyncController,
    session: &Session,
    signup_data: &str,
    return_to: String,
) -> Result<(), CliError> {
    let payload: SignupPayload = serde_json::from_str(signup_data)?;
    let nav = NavigationState::new(return_to, payload);
    match controller.handle_post_signup(session, &nav).await {
        ProvisionOutcome::Created => println!("account provisioned"),
        ProvisionOutcome::AlreadyProvisioned => println!("account already provisioned"),
        ProvisionOutcome::Skipped(reason) => println!("provisioning skipped: {reason:?}"),
        ProvisionOutcome::Failed => return Err(CliError::ProvisioningFailed),
    }
    Ok(())
}

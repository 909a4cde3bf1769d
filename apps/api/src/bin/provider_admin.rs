//! provider-admin - manage identity provider accounts.
//!
//! ```bash
//! provider-admin list
//! provider-admin create someone@example.com
//! provider-admin delete <uid>
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use identity_api::admin::{self, AdminCommand, TEST_USER_DISPLAY_NAME, TEST_USER_PASSWORD};
use identity_api::provider::{self, MAX_LIST_RESULTS};

#[derive(Parser)]
#[command(name = "provider-admin")]
#[command(about = "Manage identity provider users")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Service-account credentials file
    #[arg(
        long,
        global = true,
        env = "FIREBASE_CREDENTIALS_PATH",
        default_value = "firebase-credentials.json"
    )]
    credentials: PathBuf,

    /// Overrides the project id found in the credentials file
    #[arg(long, global = true, env = "FIREBASE_PROJECT_ID")]
    project_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all provider users
    List {
        #[arg(long, default_value_t = MAX_LIST_RESULTS)]
        max_results: u32,
    },
    /// Create a disposable test user
    Create {
        email: String,
        #[arg(long, default_value = TEST_USER_PASSWORD)]
        password: String,
        #[arg(long, default_value = TEST_USER_DISPLAY_NAME)]
        display_name: String,
    },
    /// Delete a user by provider UID
    Delete { uid: String },
}

impl From<Commands> for AdminCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::List { max_results } => AdminCommand::List { max_results },
            Commands::Create {
                email,
                password,
                display_name,
            } => AdminCommand::Create {
                email,
                password,
                display_name,
            },
            Commands::Delete { uid } => AdminCommand::Delete { uid },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let provider = provider::from_credentials_file(&cli.credentials, cli.project_id.as_deref());

    let mut stdout = std::io::stdout();
    match admin::run(provider.as_ref(), cli.command.into(), &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

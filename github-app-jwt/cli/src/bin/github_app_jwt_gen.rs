/*
cargo run -p github-app-jwt-cli --bin github_app_jwt_gen -- --private-key-file '/path/app.private-key.pem' --github-app-id 12345

Or

cargo install github-app-jwt-cli
github_app_jwt_gen --private-key-file '/path/app.private-key.pem' --github-app-id 12345
*/

use std::{
    io::{self, Write as _},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use github_app_jwt::{issue, IssueConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Print a JWT for authenticating as a GitHub App
#[derive(Parser, Debug)]
#[command(name = "github-app-jwt", version, about, long_about = None)]
struct Args {
    /// Path to the private key file
    #[arg(long, env = "GITHUB_APP_PRIVATE_KEY_FILE")]
    private_key_file: PathBuf,

    /// Github App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    github_app_id: u64,

    /// Enable debug logging
    #[arg(long, env = "GITHUB_APP_JWT_DEBUG")]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_directive = if args.debug {
        "github_app_jwt=debug"
    } else {
        "error"
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = IssueConfig::new(args.private_key_file, args.github_app_id).debug(args.debug);

    let token = match issue(&config) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(step = %err.step(), "{}", err.report(config.debug));
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout.write_all(token.as_bytes()).and_then(|_| stdout.flush()) {
        tracing::error!("Error writing token: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

//! Provision a user, an account and its first admin membership from JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use clap::Parser;
use ortho_config::OrthoConfig;
use serde_json::json;
use tenancy::bootstrap::Application;
use tenancy::config::AppSettings;
use tenancy::domain::ports::{SignupRequest, SignupResult};
use tenancy::domain::{Claims, Error};
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `provision-account` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "provision-account",
    about = "Create a user, an account and the owning admin membership",
    version
)]
struct CliArgs {
    /// JSON signup request. Read from stdin when omitted.
    #[arg(long = "input", value_name = "path")]
    input: Option<PathBuf>,
    /// Run against an in-memory store instead of PostgreSQL.
    #[arg(long = "dry-run")]
    dry_run: bool,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = AppSettings::load_from_iter([OsString::from("provision-account")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;

    let raw = match &args.input {
        Some(path) => read_input_file(path)?,
        None => read_stdin()?,
    };
    let request = parse_request(&raw)?;

    let app = if args.dry_run {
        info!("dry run: using in-memory store");
        Application::in_memory(&settings).0
    } else {
        Application::connect(&settings)
            .await
            .map_err(|error| io::Error::other(format!("connect: {error}")))?
    };

    let result = app
        .signup(&Claims::anonymous(), request, CancellationToken::new())
        .await
        .map_err(|error| io::Error::other(describe_failure(Error::from(error))))?;

    println!("{}", render_result(&result));
    Ok(())
}

fn parse_request(raw: &str) -> io::Result<SignupRequest> {
    serde_json::from_str(raw).map_err(|error| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("parse signup request: {error}"),
        )
    })
}

fn render_result(result: &SignupResult) -> String {
    json!({
        "user_id": result.user.id,
        "account_id": result.account.id,
    })
    .to_string()
}

fn describe_failure(error: Error) -> String {
    match error.details() {
        Some(details) => format!("signup failed: {error} {details}"),
        None => format!("signup failed: {error}"),
    }
}

fn read_input_file(path: &Path) -> io::Result<String> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "input path must be a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        io::Error::other(format!(
            "open input parent directory '{}': {error}",
            parent.display()
        ))
    })?;
    directory
        .read_to_string(Path::new(file_name))
        .map_err(|error| io::Error::other(format!("read input file '{}': {error}", path.display())))
}

fn read_stdin() -> io::Result<String> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .map_err(|error| io::Error::other(format!("read stdin: {error}")))?;
    Ok(raw)
}

//! Command-line front end for the actors API.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::process::ExitCode;

use anyhow::Context;
use apify_client::{
    ApifyClient, BuildOptions, CallOptions, ClientConfig, ConnectionArgs, FailurePolicy,
    LastRunOptions, ListActorsOptions, RunInput, StartOptions,
};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List actors
    List {
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
        /// Newest first
        #[arg(long)]
        desc: bool,
        /// Only actors you own
        #[arg(long)]
        my: bool,
    },
    /// Show one actor
    Get { actor: String },
    /// Start a run without waiting for it
    Start {
        actor: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Start a run and wait for it to finish
    Call {
        actor: String,
        #[command(flatten)]
        run: RunArgs,
        /// Seconds to wait; omit to wait until the run finishes
        #[arg(long)]
        wait_secs: Option<u64>,
        /// Exit with an error when the run does not succeed
        #[arg(long)]
        fail_on_error: bool,
    },
    /// Build a version of an actor
    Build {
        actor: String,
        #[arg(long)]
        version_number: String,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        beta_packages: bool,
        #[arg(long)]
        use_cache: bool,
    },
    /// Print the log of the actor's last run
    LastRunLog { actor: String },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Run input
    #[arg(long)]
    input: Option<String>,
    /// Content type of --input; JSON is assumed when omitted
    #[arg(long)]
    content_type: Option<String>,
    /// Memory in megabytes
    #[arg(long)]
    memory: Option<u32>,
    /// Timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Build tag or number
    #[arg(long)]
    build: Option<String>,
}

impl RunArgs {
    fn into_options(self) -> anyhow::Result<StartOptions> {
        let input = match (self.input, self.content_type) {
            (None, _) => None,
            (Some(body), Some(content_type)) => Some(RunInput::raw(content_type, body)),
            (Some(body), None) => Some(RunInput::Json(
                serde_json::from_str(&body).context("--input is not valid JSON")?,
            )),
        };
        Ok(StartOptions {
            input,
            timeout: self.timeout,
            memory: self.memory,
            build: self.build,
            ..StartOptions::default()
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an optional record; a missing one prints `null` and fails.
fn print_found<T: Serialize>(value: Option<&T>) -> anyhow::Result<ExitCode> {
    print_json(&value)?;
    Ok(if value.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ClientConfig::load(&cli.connection).context("failed to load configuration")?;
    info!(
        name: "client.config.loaded",
        base_url = %config.base_url,
        max_retries = config.max_retries,
        "Client configuration loaded"
    );
    let client = ApifyClient::new(config)?;

    match cli.command {
        Command::List {
            limit,
            offset,
            desc,
            my,
        } => {
            let options = ListActorsOptions {
                limit,
                offset,
                desc: desc.then_some(true),
                my: my.then_some(true),
            };
            print_json(&client.actors().list(&options).await?)?;
        }
        Command::Get { actor } => return print_found(client.actor(&actor).get().await?.as_ref()),
        Command::Start { actor, run } => {
            print_json(&client.actor(&actor).start(&run.into_options()?).await?)?;
        }
        Command::Call {
            actor,
            run,
            wait_secs,
            fail_on_error,
        } => {
            let options = CallOptions {
                start: run.into_options()?,
                wait_secs,
                failure_policy: if fail_on_error {
                    FailurePolicy::Error
                } else {
                    FailurePolicy::ReturnRun
                },
                cancel: None,
            };
            print_json(&client.actor(&actor).call(&options).await?)?;
        }
        Command::Build {
            actor,
            version_number,
            tag,
            beta_packages,
            use_cache,
        } => {
            let options = BuildOptions {
                version_number: Some(version_number),
                beta_packages: beta_packages.then_some(true),
                tag,
                use_cache: use_cache.then_some(true),
                wait_for_finish: None,
            };
            print_json(&client.actor(&actor).build(&options).await?)?;
        }
        Command::LastRunLog { actor } => {
            let log = client
                .actor(&actor)
                .last_run(&LastRunOptions::default())
                .log()
                .get()
                .await?;
            match log {
                Some(text) => print!("{text}"),
                None => {
                    println!("null");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

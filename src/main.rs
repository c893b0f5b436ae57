use cad_bridge::geometry::mm_to_internal;
use cad_bridge::handlers::register_builtin;
use cad_bridge::{
    BoundingBox, BoxBody, Bridge, BridgeConfig, Dispatcher, Executor, MacroPolicy, Mailbox,
    MemoryDocument,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use glam::DVec3;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{self, EnvFilter};

/// Filesystem mailbox bridge between an external controller and a CAD host
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bridge against an in-memory demo document
    Serve(ServeArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Path of the command mailbox file
    #[arg(long, default_value = "bridge_command.txt")]
    command_file: PathBuf,

    /// Path of the response mailbox file
    #[arg(long, default_value = "bridge_response.txt")]
    response_file: PathBuf,

    /// Watcher poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Abort a macro at the first failing step instead of finishing with an
    /// aggregate success response
    #[arg(long)]
    abort_macro_on_error: bool,

    /// Seed a demo body, e.g. "Block=50x30x20@0,0,10" (sizes and center in
    /// millimeters). May be repeated.
    #[arg(long = "body", value_name = "SPEC")]
    bodies: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut document = MemoryDocument::new();
    for spec in &args.bodies {
        document.insert(parse_body_spec(spec)?);
    }

    let mut dispatcher = Dispatcher::new();
    register_builtin(&mut dispatcher);
    tracing::info!(
        commands = dispatcher.command_names().len(),
        "dispatcher ready"
    );

    let policy = if args.abort_macro_on_error {
        MacroPolicy::AbortOnError
    } else {
        MacroPolicy::ContinueAndAggregate
    };
    let executor = Executor::new(dispatcher, document, Mailbox::new(&args.response_file))
        .with_macro_policy(policy);

    let config = BridgeConfig::new(&args.command_file, &args.response_file)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms));
    let mut bridge = Bridge::new(config);

    // Capacity 1: at most one command in flight between watcher and executor.
    let (tx, rx) = mpsc::channel(1);
    bridge.start(tx).await?;
    let executor_handle = tokio::spawn(executor.run(rx));

    tokio::signal::ctrl_c()
        .await
        .wrap_err("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");
    bridge.stop().await;
    executor_handle.await.ok();
    tracing::info!("Bye!");
    Ok(())
}

/// Parses "Name=WxDxH@X,Y,Z"; the coordinates are the box center and default
/// to the origin.
fn parse_body_spec(spec: &str) -> Result<BoxBody> {
    let (name, rest) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("body spec '{spec}' is missing '='"))?;
    let (size, center) = match rest.split_once('@') {
        Some((size, center)) => (size, Some(center)),
        None => (rest, None),
    };

    let dims: Vec<f64> = size
        .split('x')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .wrap_err_with(|| format!("invalid size in body spec '{spec}'"))?;
    let [width, depth, height] = dims[..] else {
        return Err(eyre!("body spec '{spec}' needs exactly WxDxH"));
    };

    let center = match center {
        Some(center) => {
            let coords: Vec<f64> = center
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .wrap_err_with(|| format!("invalid center in body spec '{spec}'"))?;
            let [x, y, z] = coords[..] else {
                return Err(eyre!("body spec '{spec}' needs exactly X,Y,Z"));
            };
            DVec3::new(x, y, z)
        }
        None => DVec3::ZERO,
    };

    let half = DVec3::new(width, depth, height) * 0.5;
    let min = (center - half) * mm_to_internal(1.0);
    let max = (center + half) * mm_to_internal(1.0);
    Ok(BoxBody::new(name.trim(), BoundingBox::new(min, max)))
}

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kiln::controller::{ControllerState, Tracker, DEFAULT_TRACK_TTL};
use kiln::crd::Image;
use kiln::Error;
use kube::ResourceExt;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the operator
    Run(RunArgs),
    /// Show version information
    Version,
    /// Show managed Image information
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Namespace to watch (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Seconds a Builder dependency registration stays live without refresh
    #[arg(long, env = "TRACK_TTL_SECS", default_value_t = DEFAULT_TRACK_TTL.as_secs())]
    track_ttl_secs: u64,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Namespace to inspect
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "default")]
    namespace: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("kiln operator v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Info(info_args) => run_info(info_args).await,
        Commands::Run(run_args) => run_operator(run_args).await,
    }
}

async fn run_info(args: InfoArgs) -> anyhow::Result<()> {
    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    let api: kube::Api<Image> = kube::Api::namespaced(client, &args.namespace);
    let images = api
        .list(&Default::default())
        .await
        .map_err(Error::KubeError)?;

    println!("Managed Images: {}", images.items.len());
    for image in images {
        println!(
            "  {} (builds: {}, last: {})",
            image.name_any(),
            image.build_counter(),
            image
                .status
                .as_ref()
                .and_then(|s| s.last_build_ref.as_deref())
                .unwrap_or("<none>")
        );
    }
    Ok(())
}

async fn run_operator(args: RunArgs) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();

    info!("Starting kiln operator v{}", env!("CARGO_PKG_VERSION"));

    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    info!("Connected to Kubernetes cluster");

    let state = Arc::new(ControllerState {
        client,
        tracker: Arc::new(Tracker::new(Duration::from_secs(args.track_ttl_secs))),
        namespace: args.namespace,
    });

    kiln::controller::run_controller(state).await?;
    Ok(())
}

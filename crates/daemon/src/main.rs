use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;

use loam_daemon::{http_server, ServiceConfig, ServiceState};

#[derive(Parser, Debug)]
#[command(name = "loam", about = "A read-write linked data server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8443")]
    listen: SocketAddr,

    /// Storage root holding resources
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Fold the request host into the storage root (one subtree per host)
    #[arg(long)]
    vhosts: bool,

    /// Session cookie lifetime in hours
    #[arg(long, default_value_t = 24)]
    cookie_age: u64,

    /// Index file name probed when a container is requested as HTML
    /// (repeatable, probed in order)
    #[arg(long = "dir-index")]
    dir_indexes: Vec<String>,

    /// Browser skin URL for container listings
    #[arg(long)]
    dir_skin: Option<String>,

    /// Sign-up skin URL for unclaimed vhosts
    #[arg(long)]
    signup_skin: Option<String>,

    /// Remote WebID profile fetch timeout in seconds
    #[arg(long, default_value_t = 5)]
    fetch_timeout: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig {
        listen_addr: args.listen,
        data_root: args.root,
        vhosts: args.vhosts,
        cookie_age: Duration::from_secs(args.cookie_age * 3600),
        dir_indexes: args.dir_indexes,
        dir_skin: args.dir_skin,
        signup_skin: args.signup_skin,
        profile_timeout: Duration::from_secs(args.fetch_timeout),
        log_level: args.log_level,
        ..ServiceConfig::default()
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let state = ServiceState::new(config);

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    if let Err(e) = http_server::run(state, shutdown_rx).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

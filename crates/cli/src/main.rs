use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use mesh_mcp::config::default_config_path;
use mesh_mcp::{
    AuthGateway, Credentials, MeshConfig, MeshGateway, MeshHttpServer, RmcpConnector, SessionRegistry, TokenCipher, load_config_from_path,
    resolve_bind_address,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("encrypt-token", sub)) => encrypt_token(sub),
        Some(("serve", sub)) => serve(sub).await,
        _ => serve(&matches).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_cli() -> Command {
    Command::new("mesh")
        .about("MCP gateway aggregating backend servers into packages")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .action(ArgAction::Set)
                .help("Path to the configuration file (defaults to $MESH_CONFIG_PATH or ./mesh.json)"),
        )
        .subcommand(
            Command::new("serve").about("Run the gateway (default)").arg(
                Arg::new("bind")
                    .long("bind")
                    .short('b')
                    .action(ArgAction::Set)
                    .help("Listen address, overrides httpServer.bindAddress"),
            ),
        )
        .subcommand(
            Command::new("encrypt-token")
                .about("Mint a caller token with the configured encryption key")
                .arg(Arg::new("username").long("username").short('u').required(true).action(ArgAction::Set))
                .arg(Arg::new("password").long("password").short('p').required(true).action(ArgAction::Set)),
        )
}

fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

fn load_config(matches: &ArgMatches) -> Result<MeshConfig> {
    let path = config_path(matches);
    let config = load_config_from_path(&path).with_context(|| format!("failed to load configuration from {}", path.display()))?;
    info!(
        path = %path.display(),
        servers = config.servers.len(),
        packages = config.packages.len(),
        "configuration loaded"
    );
    Ok(config)
}

async fn serve(matches: &ArgMatches) -> Result<()> {
    info!("mesh v{} starting up", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(load_config(matches)?);
    for server in config.servers.iter().filter(|server| server.err.is_some()) {
        warn!(server_id = %server.id, "server disabled: {}", server.err.as_deref().unwrap_or_default());
    }

    let bind = matches
        .try_get_one::<String>("bind")
        .ok()
        .flatten()
        .cloned()
        .unwrap_or_else(|| config.http_server.bind_address.clone());
    let bind_address = resolve_bind_address(&bind)?;

    let auth = AuthGateway::from_config(&config).context("failed to set up authentication")?;
    info!(enabled = auth.is_enabled(), "authentication configured");

    let registry = Arc::new(SessionRegistry::new(Arc::clone(&config), Arc::new(RmcpConnector::new())));
    let gateway = Arc::new(MeshGateway::new(auth, Arc::clone(&registry)));
    let running = MeshHttpServer::new(bind_address, gateway).start().await?;

    let initialize = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { registry.initialize().await }
    });

    shutdown_signal().await;
    info!("shutdown requested");

    initialize.abort();
    running.stop().await?;
    registry.shutdown().await;
    info!("mesh stopped");
    Ok(())
}

fn encrypt_token(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let encryption = config
        .encryption
        .as_ref()
        .context("configuration has no 'encryption' section")?;
    let cipher = TokenCipher::from_config(encryption)?;

    let username = matches.get_one::<String>("username").context("--username is required")?;
    let password = matches.get_one::<String>("password").context("--password is required")?;
    let token = cipher.encrypt(&Credentials::new(username.as_str(), password.as_str()))?;
    println!("{token}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!("failed to listen for SIGTERM: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Dashboard server command (`handover serve`).

use anyhow::Result;
use std::path::{Path, PathBuf};

use handover::config::HandoverConfig;
use handover::dashboard::start_server;

/// Flags that override the file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub ephemeral: bool,
    pub open: bool,
    pub dev: bool,
}

pub async fn cmd_serve(project_dir: &Path, args: ServeArgs) -> Result<()> {
    let config = HandoverConfig::load(project_dir)?;
    let mut server = config.server_config();

    if let Some(port) = args.port {
        server.port = port;
    }
    if args.ephemeral {
        server.db_path = None;
    } else if let Some(path) = &args.db_path {
        server.db_path = Some(config.resolve(path));
    }
    server.dev_mode |= args.dev;
    // No browser inside dev containers.
    server.open_browser = args.open && !server.dev_mode;

    start_server(server).await
}

use std::net::SocketAddr;

use kube::Client;
use tokio::task::JoinHandle;

use crate::{
    config::ControllerConfig, controller::run_controller,
    web::run_health_server,
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &ControllerConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn the Kubernetes controller loop.
pub fn spawn_controller(
    client: Client,
    cfg: ControllerConfig,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, cfg).await })
}

pub fn spawn_health(addr: SocketAddr) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_health_server(addr).await })
}

/// Start the controller and the health endpoint and wait until either finishes.
pub async fn run_all(client: Client, cfg: ControllerConfig) -> anyhow::Result<()> {
    let http_addr = compute_http_addr(&cfg);

    let controller = spawn_controller(client, cfg);
    let health = spawn_health(http_addr);

    tokio::select! {
        res = controller => res?,
        res = health => res?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envconfig::Envconfig;
    use std::collections::HashMap;

    #[test]
    fn http_addr_binds_all_interfaces_on_configured_port() {
        let env = HashMap::from([("HTTP_PORT".to_string(), "9191".to_string())]);
        let cfg = ControllerConfig::init_from_hashmap(&env).unwrap();
        assert_eq!(compute_http_addr(&cfg).to_string(), "0.0.0.0:9191");
    }
}

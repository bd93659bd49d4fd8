pub mod config;
pub mod controller;
pub mod crd;
pub mod runtime;
pub mod store;
pub mod web;

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Port the EventListener sink listens on. Shared by the Deployment's
/// container port, the `-port` argument and the Service port.
pub const EVENT_LISTENER_PORT: i32 = 8082;

/// Label key identifying the pods that belong to one EventListener.
pub const APP_LABEL: &str = "app";

pub fn init_tracing(default_env: &str) {
    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .from_env_lossy()
        .add_directive(
            default_env
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        );

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}

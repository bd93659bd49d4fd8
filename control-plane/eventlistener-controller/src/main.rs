use envconfig::Envconfig;
use eventlistener_controller::{
    config::ControllerConfig, init_tracing, runtime,
};
use kube::Client;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    // kube pulls in rustls; pin the provider so TLS setup never has to guess.
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    ) {
        tracing::debug!(
            ?e,
            "CryptoProvider already installed or incompatible; proceeding"
        );
    }

    let cfg = ControllerConfig::init_from_env()?;
    info!(?cfg, "Starting EventListener controller");

    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}

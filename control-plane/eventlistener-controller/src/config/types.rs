use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ControllerConfig {
    /// Container image run by every EventListener Deployment.
    /// Env: EL_IMAGE
    #[envconfig(from = "EL_IMAGE", default = "override-with-el:latest")]
    pub el_image: String,

    /// Restrict the watch to a single namespace; all namespaces when unset.
    /// Env: EL_WATCH_NAMESPACE
    #[envconfig(from = "EL_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Requeue delay after a successful pass.
    #[envconfig(from = "EL_RESYNC_SECS", default = "300")]
    pub resync_secs: u64,

    /// Requeue delay after a failed pass.
    #[envconfig(from = "EL_ERROR_REQUEUE_SECS", default = "30")]
    pub error_requeue_secs: u64,

    /// Field manager recorded on child create/update calls.
    #[envconfig(
        from = "EL_FIELD_MANAGER",
        default = "eventlistener-controller"
    )]
    pub field_manager: String,

    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub http_port: u16,
}

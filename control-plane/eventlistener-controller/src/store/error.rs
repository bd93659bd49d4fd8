pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency rejection: the object changed since it was read.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid object: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("kubernetes error: {0}")]
    Kube(#[source] kube::Error),
}

impl From<kube::Error> for StoreError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ae) if ae.code == 404 => {
                StoreError::NotFound(ae.message)
            }
            kube::Error::Api(ae)
                if ae.code == 409 && ae.reason == "AlreadyExists" =>
            {
                StoreError::AlreadyExists(ae.message)
            }
            kube::Error::Api(ae) if ae.code == 409 => {
                StoreError::Conflict(ae.message)
            }
            other => StoreError::Kube(other),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// User-message policy: the job has already finished.
    #[error("job {0} is already finished")]
    AlreadyDone(u32),

    /// User-message policy: no reachable client for this job.
    #[error("no reachable client for job {0}")]
    Disabled(u32),

    #[error("dispatcher is shut down")]
    DispatcherClosed,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

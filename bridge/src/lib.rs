pub mod http;
pub mod session;
pub mod simulator;
pub mod transport;


/// Git revision of the host software.
pub const VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No command provided.")]
    EmptyCommand,

    #[error("Serial port is not open.")]
    DeviceUnavailable,

    #[error("{0}")]
    IoFailure(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoFailure(e.to_string())
    }
}

use thiserror::Error;

/// Errors raised while validating credentials and supervisor configuration.
///
/// Registration fails with one of these before anything is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("No network registered with id {0}")]
    UnknownNetwork(usize),
}

/// Errors reported by a [`Radio`](crate::radio::Radio) backend.
#[derive(Error, Debug)]
pub enum RadioError {
    #[error("{0} is not supported by this radio")]
    Unsupported(&'static str),

    #[error("No USB WiFi interface found")]
    NoUsbInterfaceFound,

    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Failed to execute nmcli: {0}")]
    Nmcli(String),

    #[error("Failed to parse nmcli output: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

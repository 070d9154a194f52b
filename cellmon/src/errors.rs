use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModemError {
    #[error("failed to open serial port '{device}': {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },

    #[error("no reply to '{0}' before the command timeout")]
    NoResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("command profile {index} does not exist, valid indices are 0..{count}")]
    UnknownProfile { index: usize, count: usize },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

pub type Result<T> = std::result::Result<T, ModemError>;

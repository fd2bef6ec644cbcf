use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackcatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to parse config at: {line}")]
    ConfigLine { line: String },

    #[error("no channel provided")]
    NoChannel,

    #[error("no token configured for team: {team}")]
    UnknownTeam { team: String },

    #[error("$HOME not set")]
    NoHome,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlackcatError {
    /// Short error code used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            SlackcatError::Config(_) => "CONFIG_ERROR",
            SlackcatError::ConfigLine { .. } => "CONFIG_PARSE_ERROR",
            SlackcatError::NoChannel => "NO_CHANNEL",
            SlackcatError::UnknownTeam { .. } => "UNKNOWN_TEAM",
            SlackcatError::NoHome => "NO_HOME",
            SlackcatError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SlackcatError>;

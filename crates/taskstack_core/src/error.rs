use thiserror::Error;

/// Every failure the store or the command layer can report.
///
/// `InvalidInput` covers bad user input (empty title, non-numeric id).
/// `Io` and `InvalidData` cover the backing file and the config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("not_found - {0}")]
    NotFound(String),
    #[error("empty_undo - {0}")]
    EmptyUndo(String),
    #[error("inconsistent_state - {0}")]
    InconsistentState(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::NotFound(message.into())
    }

    pub fn empty_undo<M: Into<String>>(message: M) -> Self {
        Self::EmptyUndo(message.into())
    }

    pub fn inconsistent_state<M: Into<String>>(message: M) -> Self {
        Self::InconsistentState(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::EmptyUndo(_) => "empty_undo",
            Self::InconsistentState(_) => "inconsistent_state",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message)
            | Self::NotFound(message)
            | Self::EmptyUndo(message)
            | Self::InconsistentState(message)
            | Self::InvalidData(message)
            | Self::Io(message) => message,
        }
    }

    /// True for failures of the backing file rather than of the request.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Io(_) | Self::InvalidData(_))
    }
}

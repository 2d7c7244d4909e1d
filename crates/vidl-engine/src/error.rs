/// Engine command names, as the engine knows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCommand {
    Probe,
    Submit,
    Cancel,
}

impl EngineCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineCommand::Probe => "get_video_info",
            EngineCommand::Submit => "download_video",
            EngineCommand::Cancel => "cancel_download",
        }
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine rejected the call; `message` is its own text.
    #[error("engine command {command} failed: {message}")]
    Command {
        command: EngineCommand,
        message: String,
    },
    #[error("engine is unavailable for {command}")]
    Unavailable { command: EngineCommand },
}

impl EngineError {
    pub fn rejected(command: EngineCommand, message: impl Into<String>) -> Self {
        Self::Command {
            command,
            message: message.into(),
        }
    }

    pub fn command(&self) -> EngineCommand {
        match self {
            EngineError::Command { command, .. } | EngineError::Unavailable { command } => *command,
        }
    }

    /// Text rendered next to the control that issued the command. Engine
    /// messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Command { message, .. } => message.clone(),
            EngineError::Unavailable { .. } => {
                "The download engine is not available, try updating or reinstalling it".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("history storage failed: {message}")]
    Storage { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DesktopError {
    #[error("folder picker failed: {message}")]
    Picker { message: String },
    #[error("failed to open {path}: {message}")]
    Open { path: String, message: String },
    #[error("no desktop integration is available")]
    Unavailable,
}

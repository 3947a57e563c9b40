/// Core error type for the relay bot.
///
/// Adapter crates map their transport errors into this type so the run
/// orchestration can report every failure to the operator the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("link parse error: {0}")]
    LinkParse(String),

    #[error("cannot resolve chat {reference}: {reason}")]
    ChatResolution { reference: String, reason: String },

    #[error("index build failed for {target}: {reason}")]
    IndexBuild { target: String, reason: String },

    #[error("relay failed for message {message_id}: {reason}")]
    Relay { message_id: i32, reason: String },

    #[error("configuration incomplete: missing {}", .0.join(", "))]
    ConfigurationIncomplete(Vec<String>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

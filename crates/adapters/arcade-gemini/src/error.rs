/// Failures while talking to the chat API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// No credential configured; no request was made.
    Disabled,
    /// The request never produced a response, or the stream broke.
    Connection(String),
    /// The API answered with a non-success status.
    Status { status: u16, message: String },
    /// The API reported an error inside the stream.
    Api(String),
    /// A stream event could not be decoded.
    Decode(String),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "chat is disabled: no API key configured"),
            Self::Connection(m) => write!(f, "connection error: {m}"),
            Self::Status { status, message } => write!(f, "API returned {status}: {message}"),
            Self::Api(m) => write!(f, "API error: {m}"),
            Self::Decode(m) => write!(f, "decode error: {m}"),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::Connection(e.to_string())
        }
    }
}

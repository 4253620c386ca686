use serde::{Deserialize, Serialize};

/// Error body returned by the REST API on a non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(flatten)]
    pub kind: ErrorKind,
}

/// The variants a bot can realistically run into. Anything else collapses
/// into [`ErrorKind::Other`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    UnknownUser,
    UnknownChannel,
    UnknownMessage,
    UnknownServer,
    NotFound,
    EmptyMessage,
    PayloadTooLarge,
    TooManyEmbeds { max: u32 },
    MissingPermission { permission: String },
    MissingUserPermission { permission: String },
    NotElevated,
    NotPrivileged,
    InvalidSession,
    InvalidCredentials,
    DuplicateNonce,
    InternalError,
    #[serde(other)]
    Other,
}

impl ErrorKind {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser
                | Self::UnknownChannel
                | Self::UnknownMessage
                | Self::UnknownServer
                | Self::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_unknown_kinds() {
        let err: Error =
            serde_json::from_str(r#"{"type":"MissingPermission","permission":"SendMessage","location":"x"}"#)
                .unwrap();
        assert!(matches!(err.kind, ErrorKind::MissingPermission { ref permission } if permission == "SendMessage"));

        let err: Error = serde_json::from_str(r#"{"type":"Banned"}"#).unwrap();
        assert!(matches!(err.kind, ErrorKind::Other));
        assert!(!err.kind.is_not_found());

        let err: Error = serde_json::from_str(r#"{"type":"UnknownChannel"}"#).unwrap();
        assert!(err.kind.is_not_found());
    }
}

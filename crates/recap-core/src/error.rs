/// Coarse reading of an HTTP status, used only to phrase error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    BadRequest,
    RateLimited,
    Server,
    Other,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            400 | 422 => Self::BadRequest,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::Unauthorized => "authentication failed, check the configured credential",
            Self::Forbidden => "permission denied for this account",
            Self::NotFound => "resource not found, check the configured URL",
            Self::Conflict => "request conflicts with the current server state",
            Self::BadRequest => "server rejected the request as malformed",
            Self::RateLimited => "rate limited by the server, try again later",
            Self::Server => "server error",
            Self::Other => "unexpected response",
        }
    }
}

/// Failure talking to one of the remote services.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{service} returned HTTP {status}: {}", .kind.hint())]
    Status {
        service: &'static str,
        status: u16,
        kind: FailureKind,
        body: String,
    },
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} sent a response that could not be read: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub fn status(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            service,
            status,
            kind: FailureKind::from_status(status),
            body: body.into(),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Status { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Failure reading local clones.
#[derive(Debug, thiserror::Error)]
pub enum LocalHistoryError {
    #[error("git not available: {0}")]
    GitMissing(#[source] std::io::Error),
    #[error("`git {args}` failed in {repo}: {stderr}")]
    GitFailed {
        repo: String,
        args: String,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_statuses() {
        assert_eq!(FailureKind::from_status(401), FailureKind::Unauthorized);
        assert_eq!(FailureKind::from_status(403), FailureKind::Forbidden);
        assert_eq!(FailureKind::from_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(409), FailureKind::Conflict);
        assert_eq!(FailureKind::from_status(422), FailureKind::BadRequest);
        assert_eq!(FailureKind::from_status(429), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_status(503), FailureKind::Server);
        assert_eq!(FailureKind::from_status(302), FailureKind::Other);
    }

    #[test]
    fn status_error_message_names_service_and_hint() {
        let e = RemoteError::status("gitlab", 401, "{\"message\":\"401 Unauthorized\"}");
        let msg = e.to_string();
        assert!(msg.contains("gitlab"));
        assert!(msg.contains("401"));
        assert!(msg.contains("authentication failed"));
        assert_eq!(e.kind(), Some(FailureKind::Unauthorized));
    }
}

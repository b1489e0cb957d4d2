use std::time::Duration;
use thiserror::Error;

// What went wrong below HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionReset,
    TimedOut,
    DnsFailure,
    ConnectionRefused,
    Other,
}

impl TransportErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            TransportErrorKind::ConnectionReset => "ECONNRESET",
            TransportErrorKind::TimedOut => "ETIMEDOUT",
            TransportErrorKind::DnsFailure => "ENOTFOUND",
            TransportErrorKind::ConnectionRefused => "ECONNREFUSED",
            TransportErrorKind::Other => "TRANSPORT",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportErrorKind::ConnectionReset
                | TransportErrorKind::TimedOut
                | TransportErrorKind::DnsFailure
        )
    }
}

#[derive(Debug, Clone, Error)]
#[error("{} ({message})", .kind.code())]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Every way a `request()` call can fail.
///
/// [`ClientError::code`] gives the stable kind string (`RATE_LIMIT_EXCEEDED`,
/// `TIMEOUT`, `HTTP_404`, `ECONNRESET`, ...).
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("rate limit exceeded, retry in {}s", .retry_after.as_secs())]
    RateLimitExceeded { retry_after: Duration },

    #[error("request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn code(&self) -> String {
        match self {
            ClientError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED".to_string(),
            ClientError::Timeout { .. } => "TIMEOUT".to_string(),
            ClientError::Http { status, .. } => format!("HTTP_{}", status),
            ClientError::Transport(e) => e.kind.code().to_string(),
            ClientError::Decode(_) => "DECODE".to_string(),
            ClientError::InvalidUrl(_) => "INVALID_URL".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    // 429, 5xx and the transient transport kinds. Timeouts are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            ClientError::Transport(e) => e.kind.is_retryable(),
            _ => false,
        }
    }

    // How long to wait before the next attempt, None when this error ends the loop
    pub fn retry_delay(&self, attempt: u32, base: Duration) -> Option<Duration> {
        if !self.is_retryable() {
            return None;
        }
        let linear = base.saturating_mul(attempt.max(1));
        match self {
            ClientError::Http {
                status: 429,
                retry_after: Some(wait),
                ..
            } => Some(*wait),
            _ => Some(linear),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, retry_after: Option<Duration>) -> ClientError {
        ClientError::Http {
            status,
            message: format!("HTTP {}", status),
            retry_after,
        }
    }

    #[test]
    fn codes() {
        assert_eq!(http(404, None).code(), "HTTP_404");
        assert_eq!(
            ClientError::Timeout { after: Duration::from_secs(1) }.code(),
            "TIMEOUT"
        );
        let reset = TransportError::new(TransportErrorKind::ConnectionReset, "peer went away");
        assert_eq!(ClientError::from(reset).code(), "ECONNRESET");
    }

    #[test]
    fn retry_classification() {
        assert!(http(429, None).is_retryable());
        assert!(http(503, None).is_retryable());
        assert!(!http(404, None).is_retryable());
        assert!(!http(400, None).is_retryable());
        assert!(!ClientError::Timeout { after: Duration::from_secs(10) }.is_retryable());

        let dns = TransportError::new(TransportErrorKind::DnsFailure, "no such host");
        assert!(ClientError::from(dns).is_retryable());
        let refused = TransportError::new(TransportErrorKind::ConnectionRefused, "refused");
        assert!(!ClientError::from(refused).is_retryable());
    }

    #[test]
    fn retry_after_wins_over_linear_backoff() {
        let base = Duration::from_millis(500);
        assert_eq!(
            http(429, Some(Duration::from_secs(2))).retry_delay(1, base),
            Some(Duration::from_secs(2))
        );
        assert_eq!(http(429, None).retry_delay(3, base), Some(Duration::from_millis(1500)));
        assert_eq!(http(502, None).retry_delay(2, base), Some(Duration::from_secs(1)));
        assert_eq!(http(404, None).retry_delay(1, base), None);
    }
}

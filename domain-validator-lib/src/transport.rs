//! HTTP transport used to fetch candidate pages.
//!
//! The dispatcher only needs "issue a GET, get a body or a typed failure".
//! [`Transport`] is that seam; [`HttpTransport`] implements it on `reqwest`.

use crate::error::DomainValidatorError;
use crate::types::{FailureKind, RequestFailure, ValidatorConfig};
use futures::future::BoxFuture;
use std::time::Duration;

/// Future resolving to a page body or the reason it could not be fetched.
pub type ResponseFuture = BoxFuture<'static, Result<String, RequestFailure>>;

/// Issues GET requests on behalf of the dispatcher.
///
/// `submit` runs synchronously on the control flow and may reject a request
/// outright (e.g. an unparseable URL). The returned future is driven on its
/// own task and must not borrow from the transport.
pub trait Transport: Send + Sync {
    fn submit(&self, url: &str) -> Result<ResponseFuture, RequestFailure>;
}

/// `reqwest`-backed transport with connect and request timeouts.
#[derive(Clone)]
pub struct HttpTransport {
    /// HTTP client shared by every request of the run
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default timeouts (50s request, 20s connect).
    pub fn new() -> Result<Self, DomainValidatorError> {
        let defaults = ValidatorConfig::default();
        Self::with_timeouts(defaults.request_timeout, defaults.connect_timeout)
    }

    /// Create a transport with custom timeouts.
    pub fn with_timeouts(
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, DomainValidatorError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("domain-validator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DomainValidatorError::transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }

    /// Create a transport using the timeouts of a run configuration.
    pub fn from_config(config: &ValidatorConfig) -> Result<Self, DomainValidatorError> {
        Self::with_timeouts(config.request_timeout, config.connect_timeout)
    }
}

impl Transport for HttpTransport {
    fn submit(&self, url: &str) -> Result<ResponseFuture, RequestFailure> {
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            RequestFailure::new(FailureKind::Submission, format!("invalid URL '{}': {}", url, e))
        })?;
        Ok(Box::pin(fetch_body(self.http_client.get(parsed))))
    }
}

async fn fetch_body(request: reqwest::RequestBuilder) -> Result<String, RequestFailure> {
    let response = request.send().await.map_err(classify_error)?;
    let status = response.status();

    // Parking pages are often served with non-2xx codes, so the body is
    // classified regardless of status.
    match response.text().await {
        Ok(body) => Ok(body),
        Err(e) if e.is_timeout() => Err(classify_error(e)),
        Err(e) => {
            tracing::debug!(%status, error = %e, "Unreadable response body, treating as empty");
            Ok(String::new())
        }
    }
}

/// Map a `reqwest` error onto the failure kinds the router distinguishes.
pub fn classify_error(err: reqwest::Error) -> RequestFailure {
    let kind = if err.is_timeout() {
        FailureKind::TimedOut
    } else if err.is_builder() {
        FailureKind::Submission
    } else if err.is_connect() {
        if is_dns_failure(&err) {
            FailureKind::HostUnresolvable
        } else {
            FailureKind::ConnectionFailed
        }
    } else if err.is_request() || err.is_redirect() || err.is_body() {
        FailureKind::ConnectionFailed
    } else {
        FailureKind::Other
    };

    RequestFailure::new(kind, error_chain(&err))
}

/// Resolver failures only show up in the error chain's messages.
fn is_dns_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    const DNS_HINTS: &[&str] = &[
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
    ];

    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_lowercase();
        if DNS_HINTS.iter().any(|hint| text.contains(hint)) {
            return true;
        }
        current = e.source();
    }
    false
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: Option<Box<Wrapped>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn test_transport_creation() {
        assert!(HttpTransport::new().is_ok());
        assert!(HttpTransport::from_config(&ValidatorConfig::new(0)).is_ok());
    }

    #[test]
    fn test_invalid_url_is_a_submission_failure() {
        let transport = HttpTransport::new().unwrap();
        let failure = transport.submit("http://exa mple.com").err().unwrap();
        assert_eq!(failure.kind, FailureKind::Submission);
    }

    #[test]
    fn test_dns_failure_detected_in_source_chain() {
        let err = Wrapped {
            message: "error trying to connect",
            source: Some(Box::new(Wrapped {
                message: "dns error: failed to lookup address information",
                source: None,
            })),
        };
        assert!(is_dns_failure(&err));
        assert_eq!(
            error_chain(&err),
            "error trying to connect: dns error: failed to lookup address information"
        );

        let refused = Wrapped {
            message: "tcp connect error: Connection refused (os error 111)",
            source: None,
        };
        assert!(!is_dns_failure(&refused));
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let transport =
            HttpTransport::with_timeouts(Duration::from_secs(5), Duration::from_secs(2)).unwrap();
        // Port 1 on loopback has no listener.
        let failure = transport
            .submit("http://127.0.0.1:1/")
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::ConnectionFailed);
    }
}

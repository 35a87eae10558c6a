//! HTTPS plumbing shared by the HTTP-backed providers and remote transports.

use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

/// Hyper client speaking both plain HTTP and rustls-backed HTTPS.
pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Builds a client trusting the bundled web PKI roots.
#[must_use]
pub fn build_https_client() -> HttpsClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    Client::builder().build::<_, Body>(HttpsConnector::from((http, Arc::new(config))))
}

/// Validates a base URL and normalises it to end with `/`.
///
/// # Errors
///
/// Returns [`AdapterError::Configuration`] when the scheme is missing or the
/// URL does not parse.
pub fn sanitize_base_url(label: &str, input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(format!(
            "{label} base URL must start with http:// or https://"
        )));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid {label} base URL: {err}")))?;
    Ok(base)
}

/// Joins a sanitised base URL and a relative path into a [`Uri`].
///
/// # Errors
///
/// Returns [`AdapterError::Configuration`] when the result does not parse.
pub fn endpoint(label: &str, base: &str, path: &str) -> AdapterResult<Uri> {
    format!("{base}{}", path.trim_start_matches('/'))
        .parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid {label} endpoint: {err}")))
}

/// Sends `request` with a deadline and buffers the response body.
///
/// # Errors
///
/// Returns [`AdapterError::Transport`] on timeout or I/O failure and
/// [`AdapterError::Response`] for non-success statuses.
pub async fn send(
    client: &HttpsClient,
    request: Request<Body>,
    deadline: Duration,
    label: &str,
) -> AdapterResult<Bytes> {
    let response = timeout(deadline, client.request(request))
        .await
        .map_err(|_| AdapterError::transport(format!("{label} request timed out")))?
        .map_err(|err| AdapterError::transport(format!("{label} request failed: {err}")))?;

    let status = response.status();
    let bytes = to_bytes(response.into_body())
        .await
        .map_err(|err| AdapterError::transport(format!("failed to read {label} response: {err}")))?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited { retry_after: None });
    }
    if !status.is_success() {
        return Err(AdapterError::Response {
            reason: format!("{label} returned {status}: {}", String::from_utf8_lossy(&bytes)),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_requires_scheme() {
        let err = sanitize_base_url("OpenAI", "api.openai.com").expect_err("missing scheme");
        assert!(matches!(err, AdapterError::Configuration { .. }));
        assert!(err.to_string().contains("OpenAI"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let base = sanitize_base_url("Ollama", "http://localhost:11434").unwrap();
        assert_eq!(base, "http://localhost:11434/");
        let uri = endpoint("Ollama", &base, "/api/chat").unwrap();
        assert_eq!(uri.path(), "/api/chat");
    }
}

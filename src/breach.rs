//! k-anonymous breach lookup against a Pwned-Passwords style range API
//!
//! Only the first five hex characters of the password's SHA-1 leave the
//! process. The service answers with every `SUFFIX:COUNT` record under that
//! prefix and the match happens locally.

use async_trait::async_trait;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BreachSettings;
use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};

pub const DEFAULT_RANGE_ENDPOINT: &str = "https://api.pwnedpasswords.com/range/";

/// Number of hex characters sent to the range endpoint.
pub const PREFIX_LEN: usize = 5;

/// Outcome of one breach lookup.
///
/// `count` is 0 both for "not found" and for "could not check"; `warning`
/// tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BreachQueryResult {
    pub count: u64,
    pub warning: Option<String>,
}

impl BreachQueryResult {
    pub fn found(count: u64) -> Self {
        Self {
            count,
            warning: None,
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            count: 0,
            warning: Some(reason.into()),
        }
    }

    pub fn is_breached(&self) -> bool {
        self.count > 0
    }
}

/// Fetches the raw range listing for a hash prefix.
#[async_trait]
pub trait RangeClient: Send + Sync {
    async fn fetch_range(&self, prefix: &str) -> Result<String>;
}

/// [`RangeClient`] over HTTPS.
#[derive(Clone, Debug)]
pub struct HttpRangeClient {
    client: Client,
    endpoint: String,
}

impl HttpRangeClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("svpbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SvpError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Network,
                    "failed to build HTTP client",
                    e,
                )
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RangeClient for HttpRangeClient {
    async fn fetch_range(&self, prefix: &str) -> Result<String> {
        let url = format!("{}{}", self.endpoint, prefix);
        let resp = self.client.get(&url).send().await.map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SvpError::with_kind(
                ErrorCategory::Network,
                ErrorKind::Network,
                format!("range lookup failed (HTTP {})", status),
            ));
        }

        resp.text().await.map_err(network_error)
    }
}

fn network_error(e: reqwest::Error) -> SvpError {
    if e.is_timeout() {
        SvpError::with_kind_and_source(
            ErrorCategory::Network,
            ErrorKind::Timeout,
            "range lookup timed out",
            e,
        )
    } else {
        SvpError::with_kind_and_source(
            ErrorCategory::Network,
            ErrorKind::Network,
            "range lookup failed",
            e,
        )
    }
}

/// Upper-case hex SHA-1 of `password`, split into (prefix, suffix).
pub fn hash_split(password: &str) -> (String, String) {
    let mut digest = hex::encode_upper(Sha1::digest(password.as_bytes()));
    let suffix = digest.split_off(PREFIX_LEN);
    (digest, suffix)
}

/// Find `suffix` in a range listing and return its count, or 0 if absent.
///
/// Lines that are not `SUFFIX:COUNT` records are skipped. Only a matching
/// record with an unparsable count makes the response malformed.
pub fn parse_range(body: &str, suffix: &str) -> Result<u64> {
    for line in body.lines() {
        let Some((candidate, count)) = line.trim().split_once(':') else {
            continue;
        };
        if candidate.trim().eq_ignore_ascii_case(suffix) {
            return count
                .trim()
                .parse::<u64>()
                .map_err(|_| malformed(format!("unparsable count {:?}", count)));
        }
    }
    Ok(0)
}

fn malformed(msg: String) -> SvpError {
    SvpError::with_kind(ErrorCategory::Network, ErrorKind::MalformedResponse, msg)
}

pub struct BreachChecker<C = HttpRangeClient> {
    client: C,
    timeout: Duration,
}

impl BreachChecker<HttpRangeClient> {
    pub fn from_settings(settings: &BreachSettings) -> Result<Self> {
        let client = HttpRangeClient::new(settings.endpoint.clone(), settings.timeout())?;
        Ok(Self::new(client, settings.timeout()))
    }
}

impl<C: RangeClient> BreachChecker<C> {
    /// `timeout` bounds the whole lookup, whatever the client does.
    pub fn new(client: C, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Look up how often `password` appears in the breach corpus.
    ///
    /// Never fails: an unreachable, slow or garbled service yields count 0
    /// with a warning. An empty password is not looked up at all.
    pub async fn check(&self, password: &str) -> BreachQueryResult {
        if password.is_empty() {
            return BreachQueryResult::default();
        }

        let (prefix, suffix) = hash_split(password);
        match self.lookup(&prefix, &suffix).await {
            Ok(count) => {
                debug!(%prefix, count, "breach lookup complete");
                BreachQueryResult::found(count)
            }
            Err(e) => {
                warn!(%prefix, error = %e.chain(), "breach lookup failed; treating as unknown");
                BreachQueryResult::unknown(format!("breach check unavailable: {}", e.chain()))
            }
        }
    }

    async fn lookup(&self, prefix: &str, suffix: &str) -> Result<u64> {
        let body = tokio::time::timeout(self.timeout, self.client.fetch_range(prefix))
            .await
            .map_err(|_| {
                SvpError::with_kind(
                    ErrorCategory::Network,
                    ErrorKind::Timeout,
                    "range lookup timed out",
                )
            })??;
        parse_range(&body, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // SHA-1("password") = 5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8
    const PW_PREFIX: &str = "5BAA6";
    const PW_SUFFIX: &str = "1E4C9B93F3F0682250B6CF8331B7EE68FD8";

    struct StubClient {
        body: Option<String>,
        seen: Mutex<Vec<String>>,
    }

    impl StubClient {
        fn ok(body: &str) -> Self {
            Self {
                body: Some(body.to_owned()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RangeClient for StubClient {
        async fn fetch_range(&self, prefix: &str) -> Result<String> {
            self.seen.lock().unwrap().push(prefix.to_owned());
            self.body.clone().ok_or_else(|| {
                SvpError::with_kind(ErrorCategory::Network, ErrorKind::Network, "connection refused")
            })
        }
    }

    struct HangingClient;

    #[async_trait]
    impl RangeClient for HangingClient {
        async fn fetch_range(&self, _prefix: &str) -> Result<String> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_hash_split() {
        let (prefix, suffix) = hash_split("password");
        assert_eq!(prefix, PW_PREFIX);
        assert_eq!(suffix, PW_SUFFIX);
        assert_eq!(prefix.len() + suffix.len(), 40);
    }

    #[test]
    fn test_parse_range_match() {
        let body = format!(
            "0018A45C4D1DEF81644B54AB7F969B88D65:1\r\n{}:5\r\n011053FD0102E94D6AE2F8B83D76FAF94F6:1",
            PW_SUFFIX
        );
        assert_eq!(parse_range(&body, PW_SUFFIX).unwrap(), 5);
    }

    #[test]
    fn test_parse_range_case_insensitive() {
        let body = format!("{}:42\n", PW_SUFFIX.to_lowercase());
        assert_eq!(parse_range(&body, PW_SUFFIX).unwrap(), 42);
    }

    #[test]
    fn test_parse_range_absent_and_empty() {
        assert_eq!(parse_range("0018A45C4D1DEF81644B54AB7F969B88D65:1\n", PW_SUFFIX).unwrap(), 0);
        assert_eq!(parse_range("", PW_SUFFIX).unwrap(), 0);
    }

    #[test]
    fn test_parse_range_skips_unrecognised_lines() {
        assert_eq!(parse_range("<html>oops</html>", PW_SUFFIX).unwrap(), 0);

        let body = format!("garbage-line\n{}:5\n", PW_SUFFIX);
        assert_eq!(parse_range(&body, PW_SUFFIX).unwrap(), 5);
    }

    #[test]
    fn test_parse_range_malformed() {
        let body = format!("{}:lots\n", PW_SUFFIX);
        let err = parse_range(&body, PW_SUFFIX).expect_err("bad count");
        assert_eq!(err.kind, Some(ErrorKind::MalformedResponse));
    }

    #[tokio::test]
    async fn test_check_sends_only_prefix() {
        let stub = StubClient::ok(&format!("{}:5\n", PW_SUFFIX));
        let checker = BreachChecker::new(stub, Duration::from_secs(1));
        let result = checker.check("password").await;
        assert_eq!(result, BreachQueryResult::found(5));
        assert!(result.is_breached());
        assert_eq!(*checker.client.seen.lock().unwrap(), vec![PW_PREFIX.to_owned()]);
    }

    #[tokio::test]
    async fn test_check_no_match() {
        let checker = BreachChecker::new(StubClient::ok("ABC:1\n"), Duration::from_secs(1));
        let result = checker.check("password").await;
        assert_eq!(result.count, 0);
        assert_eq!(result.warning, None);
    }

    #[tokio::test]
    async fn test_empty_password_skips_lookup() {
        let checker = BreachChecker::new(StubClient::failing(), Duration::from_secs(1));
        assert_eq!(checker.check("").await, BreachQueryResult::default());
        assert!(checker.client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_is_absorbed() {
        let checker = BreachChecker::new(StubClient::failing(), Duration::from_secs(1));
        let result = checker.check("password").await;
        assert_eq!(result.count, 0);
        assert!(result.warning.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_response_is_absorbed() {
        let body = format!("{}:-1\n", PW_SUFFIX);
        let checker = BreachChecker::new(StubClient::ok(&body), Duration::from_secs(1));
        let result = checker.check("password").await;
        assert_eq!(result.count, 0);
        assert!(result.warning.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_client_times_out() {
        let checker = BreachChecker::new(HangingClient, Duration::from_millis(250));
        let result = checker.check("password").await;
        assert_eq!(result.count, 0);
        assert!(result.warning.unwrap().contains("timed out"));
    }
}

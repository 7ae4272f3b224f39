//! Google Cloud Storage remote.
//!
//! Objects live at `<prefix>/<key>` in one bucket and are reached through the
//! XML API. Creation sends `x-goog-if-generation-match: 0`, so the service
//! rejects an existing object with `412 Precondition Failed`, which maps to
//! [`WriteOutcome::AlreadyExists`].
//!
//! Requests carry a bearer token taken from the config or from
//! `GOOGLE_OAUTH_ACCESS_TOKEN` (for example `gcloud auth print-access-token`).
//! Without one, requests are anonymous, which suits emulators and public
//! buckets.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::RemoteError;
use crate::{Remote, WriteOutcome, DEFAULT_PREFIX};

/// Public GCS endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Connection settings for [`GcsRemote`].
#[derive(Clone, PartialEq, Eq)]
pub struct GcsConfig {
    pub bucket: String,
    pub prefix: String,
    pub endpoint_url: String,
    pub access_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl GcsConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            timeout: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for GcsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsConfig")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Write-once blob store in a GCS bucket.
pub struct GcsRemote {
    agent: ureq::Agent,
    bucket: String,
    prefix: String,
    endpoint_url: String,
    token: Option<String>,
}

impl GcsRemote {
    /// Builds the HTTP agent. No request is sent.
    pub fn connect(config: GcsConfig) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let token = config
            .access_token
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::debug!("gcs({}): no access token, requests are anonymous", config.bucket);
        }

        Self {
            agent: builder.build(),
            bucket: config.bucket,
            prefix: config.prefix,
            endpoint_url: config.endpoint_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full object name for a blob key.
    pub fn object_key(&self, key: &str) -> String {
        crate::prefixed_key(&self.prefix, key)
    }

    fn object_url(&self, object_key: &str) -> String {
        format!("{}/{}/{object_key}", self.endpoint_url, self.bucket)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token.trim())),
            None => request,
        }
    }

    fn service_error(&self, op: &str, object_key: &str, err: ureq::Error) -> RemoteError {
        let detail = match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                format!("HTTP {code}: {}", body.trim())
            }
            ureq::Error::Transport(transport) => transport.to_string(),
        };
        RemoteError::Service {
            backend: self.to_string(),
            message: format!("{op} gs://{}/{object_key} failed: {detail}", self.bucket),
        }
    }
}

impl fmt::Debug for GcsRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsRemote")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GcsRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gcs({}, {})", self.bucket, self.prefix)
    }
}

impl Remote for GcsRemote {
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        let object_key = self.object_key(key);
        let request = self.authorize(self.agent.get(&self.object_url(&object_key)));
        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Err(RemoteError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(err) => return Err(self.service_error("get", &object_key, err)),
        };

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Service {
                backend: self.to_string(),
                message: format!("reading gs://{}/{object_key}: {e}", self.bucket),
            })?;
        Ok(body)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError> {
        let object_key = self.object_key(key);
        let request = self
            .authorize(self.agent.put(&self.object_url(&object_key)))
            .set("x-goog-if-generation-match", "0")
            .set("Content-Type", "application/zip");
        match request.send_bytes(value) {
            Ok(_) => Ok(WriteOutcome::Created),
            Err(ureq::Error::Status(412, _)) => Ok(WriteOutcome::AlreadyExists),
            Err(err) => Err(self.service_error("put", &object_key, err)),
        }
    }
}

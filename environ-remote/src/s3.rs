//! S3-compatible object-store remote.
//!
//! Objects live at `<prefix>/<key>` in one bucket. Creation is conditional on
//! `If-None-Match: *`, so the service itself rejects overwrites with
//! `412 Precondition Failed`, which maps to [`WriteOutcome::AlreadyExists`].
//!
//! The AWS SDK is async; each remote owns a current-thread tokio runtime and
//! blocks on it so the [`Remote`] contract stays synchronous. Credentials come
//! from the standard AWS provider chain.

use std::fmt;
use std::time::Duration;

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;

use crate::error::RemoteError;
use crate::{Remote, WriteOutcome, DEFAULT_PREFIX};

/// Connection settings for [`S3Remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub prefix: String,
    pub region: Option<String>,
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, R2, LocalStack).
    pub endpoint_url: Option<String>,
    /// Upper bound on each get/put, including retries inside the SDK.
    pub operation_timeout: Option<Duration>,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            region: None,
            profile: None,
            endpoint_url: None,
            operation_timeout: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}

/// Write-once blob store in an S3 bucket.
pub struct S3Remote {
    client: Client,
    runtime: Runtime,
    bucket: String,
    prefix: String,
}

impl S3Remote {
    /// Builds a client from the default AWS configuration chain.
    ///
    /// No request is sent; credentials are resolved on first use.
    pub fn connect(config: S3Config) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RemoteError::Runtime)?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &config.region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            if let Some(profile) = &config.profile {
                loader = loader.profile_name(profile);
            }
            if let Some(endpoint_url) = &config.endpoint_url {
                loader = loader.endpoint_url(endpoint_url);
            }
            if let Some(timeout) = config.operation_timeout {
                loader = loader.timeout_config(
                    aws_config::timeout::TimeoutConfig::builder()
                        .operation_timeout(timeout)
                        .build(),
                );
            }
            let sdk_config = loader.load().await;

            let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
            if config.endpoint_url.is_some() {
                s3_config = s3_config.force_path_style(true);
            }
            Client::from_conf(s3_config.build())
        });

        Ok(Self {
            client,
            runtime,
            bucket: config.bucket,
            prefix: config.prefix,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full object key for a blob key.
    pub fn object_key(&self, key: &str) -> String {
        crate::prefixed_key(&self.prefix, key)
    }

    fn service_error<E>(&self, op: &str, object_key: &str, err: SdkError<E>) -> RemoteError
    where
        E: std::error::Error + ProvideErrorMetadata + 'static,
    {
        RemoteError::Service {
            backend: self.to_string(),
            message: format!(
                "{op} s3://{}/{object_key} failed (code={}): {}",
                self.bucket,
                err.code().unwrap_or("unknown"),
                DisplayErrorContext(&err)
            ),
        }
    }
}

fn http_status<E>(err: &SdkError<E>) -> Option<u16> {
    match err {
        SdkError::ServiceError(e) => Some(e.raw().status().as_u16()),
        _ => None,
    }
}

impl fmt::Debug for S3Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Remote")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for S3Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3({}, {})", self.bucket, self.prefix)
    }
}

impl Remote for S3Remote {
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        let object_key = self.object_key(key);
        self.runtime.block_on(async {
            let response = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&object_key)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) if http_status(&err) == Some(404) || err.code() == Some("NoSuchKey") => {
                    return Err(RemoteError::NotFound {
                        key: key.to_string(),
                    });
                }
                Err(err) => return Err(self.service_error("get", &object_key, err)),
            };

            let body = response.body.collect().await.map_err(|e| RemoteError::Service {
                backend: self.to_string(),
                message: format!("reading s3://{}/{object_key}: {e}", self.bucket),
            })?;
            Ok(body.into_bytes().to_vec())
        })
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError> {
        let object_key = self.object_key(key);
        self.runtime.block_on(async {
            let result = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&object_key)
                .content_length(value.len() as i64)
                .body(ByteStream::from(value.to_vec()))
                .if_none_match("*")
                .send()
                .await;

            match result {
                Ok(_) => Ok(WriteOutcome::Created),
                Err(err)
                    if http_status(&err) == Some(412)
                        || err.code() == Some("PreconditionFailed") =>
                {
                    Ok(WriteOutcome::AlreadyExists)
                }
                Err(err) => Err(self.service_error("put", &object_key, err)),
            }
        })
    }
}

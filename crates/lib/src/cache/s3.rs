//! Cache persisted as a single object in an S3 bucket.
//!
//! The client is built on first use so constructing the store never touches
//! AWS configuration or credentials.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::manifest::RemoteConfig;

use super::CacheStore;
use super::types::{CacheError, CacheSnapshot};

pub struct S3CacheStore {
  config: RemoteConfig,
  client: OnceCell<Client>,
}

impl std::fmt::Debug for S3CacheStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("S3CacheStore")
      .field("bucket", &self.config.bucket)
      .field("key", &self.config.key)
      .field("region", &self.config.region)
      .finish()
  }
}

impl S3CacheStore {
  pub fn new(config: RemoteConfig) -> Self {
    Self {
      config,
      client: OnceCell::new(),
    }
  }

  async fn client(&self) -> &Client {
    self
      .client
      .get_or_init(|| async {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
          .region(Region::new(self.config.region.clone()))
          .load()
          .await;
        Client::new(&sdk_config)
      })
      .await
  }

  fn remote_err(&self, action: &str, e: impl std::fmt::Display) -> CacheError {
    CacheError::Remote {
      message: format!("{} s3://{}/{}: {}", action, self.config.bucket, self.config.key, e),
    }
  }
}

#[async_trait]
impl CacheStore for S3CacheStore {
  fn describe(&self) -> String {
    format!("s3://{}/{} ({})", self.config.bucket, self.config.key, self.config.region)
  }

  /// A missing object is an empty snapshot; anything else the SDK reports
  /// (network, auth, permissions) is an error.
  async fn load(&self) -> Result<CacheSnapshot, CacheError> {
    let response = self
      .client()
      .await
      .get_object()
      .bucket(&self.config.bucket)
      .key(&self.config.key)
      .send()
      .await;

    let output = match response {
      Ok(output) => output,
      Err(e) => {
        if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
          debug!(bucket = %self.config.bucket, key = %self.config.key, "no remote cache, starting empty");
          return Ok(CacheSnapshot::new());
        }
        return Err(self.remote_err("get", aws_sdk_s3::error::DisplayErrorContext(&e)));
      }
    };

    let bytes = output
      .body
      .collect()
      .await
      .map_err(|e| self.remote_err("read", e))?
      .into_bytes();
    let content = String::from_utf8(bytes.to_vec()).map_err(|e| self.remote_err("decode", e))?;

    CacheSnapshot::from_json(&content)
  }

  /// A single PutObject replaces the previous object wholesale, so readers
  /// never observe a partial document.
  async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
    let content = snapshot.to_json()?;

    self
      .client()
      .await
      .put_object()
      .bucket(&self.config.bucket)
      .key(&self.config.key)
      .content_type("application/json")
      .body(ByteStream::from(content.into_bytes()))
      .send()
      .await
      .map_err(|e| self.remote_err("put", aws_sdk_s3::error::DisplayErrorContext(&e)))?;

    debug!(bucket = %self.config.bucket, key = %self.config.key, entries = snapshot.len(), "remote cache saved");
    Ok(())
  }
}

//! [`Storage`] backed by `aws-sdk-s3`

use crate::config::StorageConfig;
use crate::storage::{ListPage, ObjectInfo, Storage, StorageError};

use std::error::Error as StdErrorTrait;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types_convert::date_time::DateTimeExt;
use time::OffsetDateTime;
use tracing::debug;

const PROVIDER_NAME: &str = "s3s-browse";

/// Builds an S3 client from `config`.
///
/// Static credentials are used when both keys are configured, otherwise the default AWS
/// credential provider chain applies.
pub async fn build_client(config: &StorageConfig) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let Some((access_key, secret_key)) = config.static_credentials() {
        let cred = Credentials::new(access_key, secret_key, None, None, PROVIDER_NAME);
        loader = loader.credentials_provider(cred);
    }

    if let Some(secs) = config.timeout_secs {
        let timeout = TimeoutConfig::builder().operation_timeout(Duration::from_secs(secs)).build();
        loader = loader.timeout_config(timeout);
    }

    let sdk_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.force_path_style)
        .build();

    debug!(bucket = %config.bucket, endpoint = ?config.endpoint, region = %config.region, "built s3 client");
    Client::from_conf(s3_config)
}

fn sdk_error<E>(err: E) -> StorageError
where
    E: StdErrorTrait + Send + Sync + 'static,
{
    StorageError::with_message(DisplayErrorContext(&err).to_string(), err)
}

fn object_info(obj: &aws_sdk_s3::types::Object) -> Option<ObjectInfo> {
    let key = obj.key()?.to_owned();
    let size = obj.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
    let last_modified = obj
        .last_modified()
        .and_then(|t| t.to_time().ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    Some(ObjectInfo {
        key,
        size,
        last_modified,
    })
}

#[async_trait::async_trait]
impl Storage for Client {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StorageError> {
        let output = self
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .delimiter(delimiter)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(sdk_error)?;

        let objects = output.contents().iter().filter_map(object_info).collect();
        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(str::to_owned)
            .collect();

        Ok(ListPage {
            objects,
            common_prefixes,
            next_continuation_token: output.next_continuation_token().map(str::to_owned),
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(StorageError::new)?;
        let req = self
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(sdk_error)?;
        Ok(req.uri().to_string())
    }
}

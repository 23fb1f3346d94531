/// Shared AWS SDK configuration
///
/// Region and static credentials are common to S3 and DynamoDB; endpoint
/// overrides are applied per client so that a MinIO endpoint never leaks into
/// the record store client (and vice versa).
use crate::config::StorageConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;

pub async fn load_sdk_config(config: &StorageConfig) -> SdkConfig {
    let mut builder =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    // Fall back to the default credential chain unless both halves are set
    if let (Some(access_key_id), Some(secret_access_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        use aws_sdk_s3::config::Credentials;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "image_processor_static",
        );
        builder = builder.credentials_provider(credentials);
    }

    builder.load().await
}

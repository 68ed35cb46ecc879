use common::{Error, Result};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

/// Splits `s3://bucket/key/parts` into bucket and key.
pub fn parse_s3_uri(uri: &str) -> Result<S3Location> {
    let parsed = Url::parse(uri)?;

    if parsed.scheme() != "s3" {
        return Err(Error::InvalidUri(format!(
            "Path '{}' is not an S3 path (expected scheme 's3')",
            uri
        )));
    }

    let bucket = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::InvalidUri(format!("S3 path '{}' has no bucket", uri)))?
        .to_string();

    let key = parsed.path().trim_start_matches('/').to_string();
    if key.is_empty() {
        return Err(Error::InvalidUri(format!(
            "S3 path '{}' results in an empty object key",
            uri
        )));
    }

    Ok(S3Location { bucket, key })
}

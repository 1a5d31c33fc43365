use aws_sdk_s3::primitives::ByteStream;
use eyre::WrapErr;
use std::path::{Path, PathBuf};

/// A packaged archive consumed as an opaque blob
///
/// The S3 key is content-addressed, so a deployment always points at the
/// exact bytes that were uploaded and re-deploying unchanged artifacts
/// changes nothing in the template.
#[derive(Clone, Debug)]
pub struct Artifact {
    path: PathBuf,
    key: String,
}

impl Artifact {
    /// Read the archive and derive its S3 key from a checksum of the bytes
    pub fn new(path: &Path, label: &str) -> eyre::Result<Self> {
        let contents = std::fs::read(path)
            .wrap_err_with(|| format!("Failed to read artifact {}", path.display()))?;

        let checksum = sha256::digest(contents.as_slice());

        Ok(Artifact {
            path: path.to_path_buf(),
            key: format!("{label}-{checksum}.zip"),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upload the archive to the build bucket
    ///
    /// Skipped when an object with the same checksum is already there.
    pub async fn upload(&self, client: &aws_sdk_s3::Client, bucket: &str) -> eyre::Result<()> {
        let uploaded = client
            .head_object()
            .bucket(bucket)
            .key(&self.key)
            .send()
            .await
            .is_ok();

        if uploaded {
            log::info!("Artifact {} is already uploaded", self.key);
            return Ok(());
        }

        let body = ByteStream::from_path(&self.path)
            .await
            .wrap_err_with(|| format!("Failed to open artifact {}", self.path.display()))?;

        client
            .put_object()
            .bucket(bucket)
            .key(&self.key)
            .body(body)
            .send()
            .await
            .wrap_err_with(|| format!("Failed to upload {}", self.path.display()))?;

        Ok(())
    }
}

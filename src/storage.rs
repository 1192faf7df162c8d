//! Resume file storage: S3/MinIO when configured, a local directory otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::config::{S3Config, UploadConfig};

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Stores the object and returns the path recorded on the application.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

pub async fn build(config: &UploadConfig) -> anyhow::Result<Arc<dyn ResumeStore>> {
    match &config.s3 {
        Some(s3) => {
            info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "resumes stored in S3");
            Ok(Arc::new(S3Storage::new(s3, "us-east-1").await?))
        }
        None => {
            info!(dir = %config.dir.display(), "resumes stored on local disk");
            Ok(Arc::new(LocalDiskStorage::new(&config.dir)))
        }
    }
}

/// Accepted resume formats.
pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(cfg: &S3Config, region: &str) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl ResumeStore for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(key.to_string())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

/// Files under `root`, served by the router at `/uploads`.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            !key.split('/').any(|seg| seg.is_empty() || seg == ".." || seg == "."),
            "invalid object key {key:?}"
        );
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ResumeStore for LocalDiskStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(format!("uploads/{key}"))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.resolve(key)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(ext_from_mime("application/msword"), Some("doc"));
        let docx = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        assert_eq!(ext_from_mime(docx), Some("docx"));
        assert_eq!(ext_from_mime("image/png"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn local_disk_put_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDiskStorage::new(dir.path());
        let path = store
            .put_object("resumes/abc/cv.pdf", Bytes::from_static(b"%PDF-1.4"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(path, "uploads/resumes/abc/cv.pdf");
        let on_disk = tokio::fs::read(dir.path().join("resumes/abc/cv.pdf")).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.4");

        store.delete_object("resumes/abc/cv.pdf").await.unwrap();
        assert!(!dir.path().join("resumes/abc/cv.pdf").exists());
    }

    #[tokio::test]
    async fn local_disk_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDiskStorage::new(dir.path());
        assert!(store
            .put_object("../escape.pdf", Bytes::new(), "application/pdf")
            .await
            .is_err());
        assert!(store.delete_object("a//b").await.is_err());
    }
}

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use log::{debug, error};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use super::Error;

pub type Host = Arc<dyn ImageHost + Send + Sync>;

#[derive(Clone)]
pub struct Config {
    url: String,
    preset: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::from("https://api.cloudinary.com/v1_1/demo/image/upload"),
            preset: String::from("profile_uploads"),
        }
    }
}

impl Config {
    pub fn new(url: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            preset: preset.into(),
        }
    }

    pub fn env() -> super::Result<Self> {
        let url = env::var("UPLOAD_URL")?;
        let preset = env::var("UPLOAD_PRESET")?;
        Ok(Self { url, preset })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Folder {
    Users,
    Posts,
}

impl Folder {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Posts => "posts",
        }
    }

    const fn file_name(&self) -> &'static str {
        match self {
            Self::Users => "profile.jpg",
            Self::Posts => "post.jpg",
        }
    }
}

/// Raw jpeg bytes picked on the device.
#[derive(Clone)]
pub struct Image(Vec<u8>);

impl Image {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

#[async_trait]
pub trait ImageHost {
    async fn upload(&self, image: Image, folder: Folder) -> super::Result<Url>;
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

impl UploadResponse {
    fn into_url(self) -> super::Result<Url> {
        match self.secure_url {
            Some(u) => Url::parse(&u).map_err(Error::from),
            None => Err(Error::UploadFailed),
        }
    }
}

pub struct CloudinaryHost {
    config: Config,
    http: reqwest::Client,
}

impl CloudinaryHost {
    pub fn new(config: Config, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, image: Image, folder: Folder) -> super::Result<Url> {
        let file = Part::bytes(image.0)
            .file_name(folder.file_name())
            .mime_str("image/jpeg")?;

        let form = Form::new()
            .part("file", file)
            .text("upload_preset", self.config.preset.clone())
            .text("folder", folder.as_str());

        let res: UploadResponse = self
            .http
            .post(&self.config.url)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        res.into_url().inspect_err(|e| {
            error!("upload to {} failed: {e}", folder.as_str());
        })
    }
}

/// Stand-in host handing out stable URLs under a base address.
pub struct MemoryImageHost {
    base: Url,
    uploaded: AtomicUsize,
}

impl MemoryImageHost {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            uploaded: AtomicUsize::new(0),
        }
    }

    pub fn uploaded(&self) -> usize {
        self.uploaded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(&self, image: Image, folder: Folder) -> super::Result<Url> {
        if image.bytes().is_empty() {
            return Err(Error::UploadFailed);
        }

        let n = self.uploaded.fetch_add(1, Ordering::SeqCst);
        let url = self.base.join(&format!("{}/{n}.jpg", folder.as_str()))?;
        debug!("stored {} bytes at {url}", image.bytes().len());
        Ok(url)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_read_secure_url() {
        let res: UploadResponse = serde_json::from_str(
            r#"{"secure_url":"https://res.example.com/posts/1.jpg","bytes":10}"#,
        )
        .unwrap();

        let url = res.into_url().unwrap();
        assert_eq!(url.as_str(), "https://res.example.com/posts/1.jpg");
    }

    #[test]
    fn should_fail_without_secure_url() {
        let res: UploadResponse =
            serde_json::from_str(r#"{"error":{"message":"bad preset"}}"#).unwrap();

        assert!(matches!(res.into_url(), Err(Error::UploadFailed)));
    }

    #[tokio::test]
    async fn should_hand_out_distinct_urls() {
        let host = MemoryImageHost::new(Url::parse("https://img.local/").unwrap());

        let a = host.upload(Image::new(vec![1]), Folder::Users).await.unwrap();
        let b = host.upload(Image::new(vec![2]), Folder::Posts).await.unwrap();

        assert_eq!(a.as_str(), "https://img.local/users/0.jpg");
        assert_eq!(b.as_str(), "https://img.local/posts/1.jpg");
        assert_eq!(host.uploaded(), 2);
    }
}

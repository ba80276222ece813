use crate::error::LoadError;
use async_trait::async_trait;
use base64::Engine;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub source: String,
}

impl LoadedImage {
    pub fn decode(bytes: Vec<u8>, source: impl Into<String>) -> Result<Self, LoadError> {
        let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|err| LoadError::Decode(err.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| LoadError::Decode("unrecognized image format".to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|err| LoadError::Decode(err.to_string()))?;
        Ok(Self {
            mime: format.to_mime_type().to_string(),
            bytes,
            width,
            height,
            source: source.into(),
        })
    }

    // Some providers answer 200 with a tiny placeholder instead of a 404.
    pub fn is_real(&self, min_dimension: u32) -> bool {
        self.width > min_dimension && self.height > min_dimension
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime, encoded)
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, location: &str) -> Result<LoadedImage, LoadError>;
}

pub async fn load_with_timeout(
    source: &dyn ImageSource,
    location: &str,
    timeout: Duration,
) -> Result<LoadedImage, LoadError> {
    match tokio::time::timeout(timeout, source.load(location)).await {
        Ok(result) => result,
        Err(_) => Err(LoadError::Timeout(timeout)),
    }
}

/// Anything that is neither a `data:` nor an `http(s)` URL is read from
/// `asset_dir`.
#[derive(Debug, Clone)]
pub struct NetImageSource {
    client: reqwest::Client,
    asset_dir: PathBuf,
}

impl NetImageSource {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            asset_dir: asset_dir.into(),
        }
    }

    pub fn with_client(client: reqwest::Client, asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            asset_dir: asset_dir.into(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| LoadError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| LoadError::Request(err.to_string()))?;
        Ok(body.to_vec())
    }

    async fn read_asset(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        let relative = location.trim_start_matches('/');
        let path = if Path::new(location).is_absolute() && Path::new(location).exists() {
            PathBuf::from(location)
        } else {
            self.asset_dir.join(relative)
        };
        tokio::fs::read(&path).await.map_err(|err| LoadError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl ImageSource for NetImageSource {
    async fn load(&self, location: &str) -> Result<LoadedImage, LoadError> {
        let bytes = if location.starts_with("data:") {
            decode_data_url(location)?
        } else if location.starts_with("http://") || location.starts_with("https://") {
            self.fetch(location).await?
        } else {
            self.read_asset(location).await?
        };
        LoadedImage::decode(bytes, location)
    }
}

pub fn decode_data_url(url: &str) -> Result<Vec<u8>, LoadError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::DataUrl("missing data: prefix".to_string()))?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DataUrl("missing comma".to_string()))?;
    let is_base64 = metadata
        .split(';')
        .skip(1)
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));
    if is_base64 {
        let cleaned: String = payload.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|err| LoadError::DataUrl(format!("invalid base64: {err}")))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(input: &str) -> Result<Vec<u8>, LoadError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| LoadError::DataUrl(format!("bad escape at byte {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

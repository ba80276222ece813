#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use image::{ImageFormat, Rgba, RgbaImage};
use pledge_badge::error::LoadError;
use pledge_badge::image_source::{ImageSource, LoadedImage, decode_data_url};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

pub enum Reply {
    Image(Vec<u8>),
    Fail,
    Hang,
}

/// Serves scripted replies by exact location; `data:` URLs are decoded for
/// real and anything unscripted fails with a 404.
#[derive(Default)]
pub struct FakeImageSource {
    replies: HashMap<String, Reply>,
    requests: Mutex<Vec<String>>,
    hang_by_default: bool,
}

impl FakeImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unscripted location hangs instead of failing.
    pub fn unreachable() -> Self {
        Self {
            hang_by_default: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, location: &str, reply: Reply) -> Self {
        self.replies.insert(location.to_string(), reply);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for FakeImageSource {
    async fn load(&self, location: &str) -> Result<LoadedImage, LoadError> {
        self.requests.lock().unwrap().push(location.to_string());
        if location.starts_with("data:") {
            return LoadedImage::decode(decode_data_url(location)?, location);
        }
        match self.replies.get(location) {
            Some(Reply::Image(bytes)) => LoadedImage::decode(bytes.clone(), location),
            Some(Reply::Hang) => futures::future::pending().await,
            Some(Reply::Fail) => Err(LoadError::Status(404)),
            None if self.hang_by_default => futures::future::pending().await,
            None => Err(LoadError::Status(404)),
        }
    }
}

pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn png_data_url(bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 5, 15, 4, 0).unwrap()
}

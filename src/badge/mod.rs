//! Badge compositor: turns one pledge into a print-resolution PNG.
//!
//! The logo load and the profile resolution chain run concurrently and are
//! joined before the final composition. Each side recovers on its own: a
//! missing logo becomes the text wordmark, a missing avatar becomes the
//! initials surface. Only encoding and saving can fail the whole operation.

pub mod geometry;
pub mod scene;
pub mod surface;

use crate::config::{BadgeConfig, ResolverConfig};
use crate::error::BadgeError;
use crate::image_source::{ImageSource, LoadedImage, load_with_timeout};
use crate::pledge::{BadgeSpec, ProfileSource};
use crate::resolver::{ProfileResolver, Resolution};
use crate::text::{self, fit_lines, format_timestamp, wrap_message};
use crate::theme::Theme;
use geometry::{MESSAGE_FONT_SIZE, logo_box, message_max_lines, message_max_width};
use scene::{GENERIC_GLYPH, HeaderLayer, ProfileLayer, SceneInput};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use surface::{DirectorySaver, FileSaver, Rasterizer};
#[cfg(feature = "png")]
pub use surface::ResvgRasterizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderKind {
    Logo,
    Wordmark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileFill {
    /// A loaded image; `source` is the URL (or `data:` prefix) it came from.
    Image { source: String },
    Initials { text: String },
}

/// What ended up on the badge, for callers that want to report it without
/// decoding pixels.
#[derive(Debug, Clone)]
pub struct BadgeScene {
    pub header: HeaderKind,
    pub profile: ProfileFill,
    pub lines: Vec<String>,
    pub timestamp: String,
    pub svg: String,
}

#[derive(Debug, Clone)]
pub struct Badge {
    pub png: Vec<u8>,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub scene: BadgeScene,
}

pub struct BadgeCompositor {
    source: Arc<dyn ImageSource>,
    rasterizer: Arc<dyn Rasterizer>,
    resolver: ProfileResolver,
    config: BadgeConfig,
    theme: Theme,
}

impl BadgeCompositor {
    pub fn new(
        source: Arc<dyn ImageSource>,
        rasterizer: Arc<dyn Rasterizer>,
        resolver_config: ResolverConfig,
        config: BadgeConfig,
        theme: Theme,
    ) -> Self {
        Self {
            resolver: ProfileResolver::new(source.clone(), resolver_config),
            source,
            rasterizer,
            config,
            theme,
        }
    }

    pub fn config(&self) -> &BadgeConfig {
        &self.config
    }

    pub async fn compose(&self, spec: &BadgeSpec) -> Result<Badge, BadgeError> {
        let (header, profile) = tokio::join!(self.load_header(), self.load_profile(spec));

        let (profile_layer, profile_fill) = match profile {
            Some(image) => {
                let fill = ProfileFill::Image {
                    source: describe_source(&image.source),
                };
                (
                    ProfileLayer::Image {
                        data_url: image.to_data_url(),
                    },
                    fill,
                )
            }
            None => self.initials_fallback(&spec.username),
        };

        let measure = |line: &str| {
            text::text_width(
                line,
                MESSAGE_FONT_SIZE,
                &self.theme.font_family,
                false,
                self.config.fast_text_metrics,
            )
        };
        let lines = fit_lines(
            wrap_message(&spec.message, message_max_width(self.config.width), measure),
            message_max_lines(),
        );
        let timestamp = format_timestamp(&spec.timestamp.with_timezone(&chrono::Local));

        let svg = scene::render_badge_svg(&SceneInput {
            width: self.config.width,
            height: self.config.height,
            username: &spec.username,
            lines: &lines,
            timestamp: &timestamp,
            header: &header,
            profile: &profile_layer,
            theme: &self.theme,
        });
        let png = self.rasterizer.rasterize(
            &svg,
            self.config.width,
            self.config.height,
            self.config.scale,
        )?;
        let (width, height) = self.config.pixel_size();

        Ok(Badge {
            png,
            file_name: self.config.file_name(&spec.username),
            width,
            height,
            scene: BadgeScene {
                header: match header {
                    HeaderLayer::Logo { .. } => HeaderKind::Logo,
                    HeaderLayer::Wordmark => HeaderKind::Wordmark,
                },
                profile: profile_fill,
                lines,
                timestamp,
                svg,
            },
        })
    }

    /// Composes the badge and hands it to `saver` under its deterministic
    /// file name.
    pub async fn download(
        &self,
        spec: &BadgeSpec,
        saver: &dyn FileSaver,
    ) -> Result<PathBuf, BadgeError> {
        let badge = self.compose(spec).await?;
        let path = saver
            .save(&badge.file_name, &badge.png)
            .map_err(|source| BadgeError::Save {
                file_name: badge.file_name.clone(),
                source,
            })?;
        info!(path = %path.display(), bytes = badge.png.len(), "badge saved");
        Ok(path)
    }

    async fn load_header(&self) -> HeaderLayer {
        let logo = &self.config.logo;
        match load_with_timeout(self.source.as_ref(), logo, self.config.logo_timeout()).await {
            Ok(image) if image.width > 0 && image.height > 0 => {
                let placement = logo_box(
                    image.width as f32,
                    image.height as f32,
                    self.config.logo_target_height,
                    self.config.logo_max_width,
                    self.config.width,
                );
                HeaderLayer::Logo { image, placement }
            }
            Ok(_) => {
                warn!(%logo, "logo has no size, using text wordmark");
                HeaderLayer::Wordmark
            }
            Err(error) => {
                warn!(%logo, %error, "logo failed to load, using text wordmark");
                HeaderLayer::Wordmark
            }
        }
    }

    /// Embedded uploads are tried first and skip external probing; otherwise
    /// the pledge's own URL leads the provider list.
    async fn load_profile(&self, spec: &BadgeSpec) -> Option<LoadedImage> {
        let mut candidates = Vec::new();
        match spec.profile_source() {
            ProfileSource::Embedded(url) => {
                match load_with_timeout(self.source.as_ref(), url, self.config.embedded_timeout())
                    .await
                {
                    Ok(image) => return Some(image),
                    Err(error) => warn!(%error, "embedded profile image failed, probing providers"),
                }
            }
            ProfileSource::External(url) => candidates.push(url.to_string()),
            ProfileSource::None => {}
        }

        // Unlike the live preview, the download probes providers for any
        // non-empty username, one character included.
        let username = spec.username.trim_start_matches('@');
        if !username.is_empty() {
            for url in self.resolver.candidates(username) {
                if !candidates.contains(&url) {
                    candidates.push(url);
                }
            }
        }

        match self.resolver.resolve_chain(candidates).await {
            Resolution::Resolved { image, .. } => Some(image),
            Resolution::Exhausted { attempts } => {
                warn!(
                    username,
                    tried = attempts.len(),
                    "all profile sources failed, drawing initials"
                );
                None
            }
        }
    }

    /// Paints the initials onto a small offscreen surface and uses that as
    /// the profile image, so real photos and generated fallbacks take the
    /// same clipped-image path.
    fn initials_fallback(&self, username: &str) -> (ProfileLayer, ProfileFill) {
        let label = text::initials(username.trim_start_matches('@'))
            .unwrap_or_else(|| GENERIC_GLYPH.to_string());
        let fill = ProfileFill::Initials {
            text: label.clone(),
        };
        let size = geometry::FALLBACK_SIZE;
        let surface = self
            .rasterizer
            .rasterize(&scene::render_initials_svg(&label, &self.theme), size, size, 1.0)
            .map_err(|err| err.to_string())
            .and_then(|png| LoadedImage::decode(png, "offscreen:initials").map_err(|err| err.to_string()));
        match surface {
            Ok(image) => (
                ProfileLayer::Image {
                    data_url: image.to_data_url(),
                },
                fill,
            ),
            Err(error) => {
                debug!(%error, "offscreen initials surface failed, drawing vector initials");
                (ProfileLayer::Initials { text: label }, fill)
            }
        }
    }
}

fn describe_source(source: &str) -> String {
    if source.starts_with("data:") {
        source.split(',').next().unwrap_or("data:").to_string()
    } else {
        source.to_string()
    }
}

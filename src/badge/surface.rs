//! Injected capabilities: the drawing surface factory and the file saver.

use crate::error::BadgeError;
use std::path::{Path, PathBuf};

/// Turns a scene into encoded PNG bytes.
///
/// `width`/`height` are logical units; the surface is allocated at
/// `width * scale` by `height * scale` pixels.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, width: f32, height: f32, scale: f32)
    -> Result<Vec<u8>, BadgeError>;
}

#[cfg(feature = "png")]
pub use resvg_surface::ResvgRasterizer;

#[cfg(feature = "png")]
mod resvg_surface {
    use super::Rasterizer;
    use crate::error::BadgeError;
    use once_cell::sync::Lazy;
    use resvg::tiny_skia::{Pixmap, Transform};
    use std::sync::Arc;

    static SYSTEM_FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Arc::new(db)
    });

    #[derive(Debug, Clone)]
    pub struct ResvgRasterizer {
        fontdb: Arc<usvg::fontdb::Database>,
        font_family: String,
    }

    impl ResvgRasterizer {
        pub fn new() -> Self {
            Self {
                fontdb: SYSTEM_FONTS.clone(),
                font_family: "Arial".to_string(),
            }
        }

        pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
            self.font_family = family.into();
            self
        }
    }

    impl Default for ResvgRasterizer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Rasterizer for ResvgRasterizer {
        fn rasterize(
            &self,
            svg: &str,
            width: f32,
            height: f32,
            scale: f32,
        ) -> Result<Vec<u8>, BadgeError> {
            let mut opt = usvg::Options::default();
            opt.font_family = self.font_family.clone();
            opt.fontdb = self.fontdb.clone();
            let tree =
                usvg::Tree::from_str(svg, &opt).map_err(|err| BadgeError::Render(err.to_string()))?;

            let pixel_width = (width * scale).round() as u32;
            let pixel_height = (height * scale).round() as u32;
            let mut pixmap = Pixmap::new(pixel_width, pixel_height).ok_or_else(|| {
                BadgeError::Encoding(format!(
                    "cannot allocate {pixel_width}x{pixel_height} surface"
                ))
            })?;
            resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

            let png = pixmap
                .encode_png()
                .map_err(|err| BadgeError::Encoding(err.to_string()))?;
            if png.is_empty() {
                return Err(BadgeError::Encoding("encoder produced no bytes".to_string()));
            }
            Ok(png)
        }
    }
}

/// Where a finished badge goes: the "download" step.
pub trait FileSaver: Send + Sync {
    fn save(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf>;
}

/// Writes badges into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

#![cfg(feature = "png")]

mod common;

use common::{FakeImageSource, Reply, fixed_time, png_data_url, solid_png};
use pledge_badge::badge::{BadgeCompositor, DirectorySaver, FileSaver, ResvgRasterizer};
use pledge_badge::config::{BadgeConfig, ResolverConfig};
use pledge_badge::error::BadgeError;
use pledge_badge::pledge::BadgeSpec;
use pledge_badge::{HeaderKind, ProfileFill, Theme};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn compositor(source: Arc<FakeImageSource>) -> BadgeCompositor {
    let config = BadgeConfig {
        fast_text_metrics: true,
        ..BadgeConfig::default()
    };
    BadgeCompositor::new(
        source,
        Arc::new(ResvgRasterizer::new()),
        ResolverConfig::default(),
        config,
        Theme::succinct(),
    )
}

fn spec(username: &str, profile_url: String) -> BadgeSpec {
    BadgeSpec {
        username: username.to_string(),
        message: format!("I, {username}, pledge to hodl forever!"),
        timestamp: fixed_time(),
        profile_url,
    }
}

fn pixel(png: &[u8], x: u32, y: u32) -> [u8; 4] {
    let decoded = image::load_from_memory(png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (1440, 2160));
    decoded.get_pixel(x, y).0
}

#[tokio::test]
async fn embedded_profile_with_missing_logo() {
    let red = solid_png(64, 64, [255, 0, 0, 255]);
    let source = Arc::new(FakeImageSource::new());
    let badge = compositor(source.clone())
        .compose(&spec("alice", png_data_url(&red)))
        .await
        .unwrap();

    assert_eq!(badge.scene.header, HeaderKind::Wordmark);
    assert!(badge.scene.svg.contains("SUCCINCT"));
    assert_eq!(
        badge.scene.profile,
        ProfileFill::Image {
            source: "data:image/png;base64".to_string()
        }
    );
    // the embedded upload wins, no avatar provider is asked
    assert!(source.requests().iter().all(|r| !r.contains("unavatar")));

    // center of the profile circle, 3x density
    let [r, g, b, _] = pixel(&badge.png, 240 * 3, 260 * 3);
    assert!(r > 200 && g < 60 && b < 60, "expected red, got {r},{g},{b}");

    // header band left of the wordmark glyphs: plain background, no logo
    let [r, g, b, _] = pixel(&badge.png, 148 * 3, 60 * 3);
    assert!(b > 200 && g < 150 && r < 140, "expected background, got {r},{g},{b}");
}

#[tokio::test(start_paused = true)]
async fn unreachable_everything_still_completes_with_initials() {
    let source = Arc::new(FakeImageSource::unreachable());
    let compositor = compositor(source.clone());
    let spec = spec("nobody", "https://unavatar.io/twitter/nobody".to_string());

    let badge = tokio::time::timeout(Duration::from_secs(60), compositor.compose(&spec))
        .await
        .expect("compose must not hang")
        .unwrap();

    assert_eq!(badge.scene.header, HeaderKind::Wordmark);
    assert_eq!(
        badge.scene.profile,
        ProfileFill::Initials {
            text: "NO".to_string()
        }
    );

    let probes: Vec<String> = source
        .requests()
        .into_iter()
        .filter(|r| r.contains("nobody"))
        .collect();
    assert_eq!(
        probes,
        [
            "https://unavatar.io/twitter/nobody",
            "https://unavatar.io/x/nobody",
            "https://unavatar.io/github/nobody",
            "https://github.com/nobody.png",
        ]
    );

    // upper part of the circle, above the glyphs: fallback gradient
    let [_, g, b, _] = pixel(&badge.png, 240 * 3, 215 * 3);
    assert!(b > 225 && i32::from(b) - i32::from(g) > 125, "expected fallback purple, got g={g} b={b}");
}

#[tokio::test]
async fn logo_is_scaled_to_header_height() {
    let green = solid_png(600, 100, [0, 255, 0, 255]);
    let source = Arc::new(FakeImageSource::new().with("succinct-logo.png", Reply::Image(green)));
    let badge = compositor(source)
        .compose(&spec("bob", String::new()))
        .await
        .unwrap();
    assert_eq!(badge.scene.header, HeaderKind::Logo);
    assert!(badge.scene.svg.contains("width=\"192.00\" height=\"32.00\""));
    assert!(!badge.scene.svg.contains(">SUCCINCT<"));

    // 192x32 box centered at x 144..336, y 50..82
    for (x, y) in [(148, 60), (240, 66)] {
        let [r, g, b, _] = pixel(&badge.png, x * 3, y * 3);
        assert!(g > 200 && r < 60 && b < 60, "expected logo at ({x},{y}), got {r},{g},{b}");
    }
}

#[tokio::test]
async fn one_character_username_still_probes_providers() {
    let green = solid_png(64, 64, [0, 255, 0, 255]);
    let source = Arc::new(FakeImageSource::new().with("https://unavatar.io/x/x", Reply::Image(green)));
    let badge = compositor(source.clone())
        .compose(&spec("x", String::new()))
        .await
        .unwrap();

    assert_eq!(
        badge.scene.profile,
        ProfileFill::Image {
            source: "https://unavatar.io/x/x".to_string()
        }
    );
    let probes: Vec<String> = source
        .requests()
        .into_iter()
        .filter(|r| r.contains("unavatar"))
        .collect();
    assert_eq!(probes, ["https://unavatar.io/twitter/x", "https://unavatar.io/x/x"]);

    let [r, g, b, _] = pixel(&badge.png, 240 * 3, 260 * 3);
    assert!(g > 200 && r < 60 && b < 60, "expected avatar, got {r},{g},{b}");
}

#[tokio::test]
async fn long_messages_are_cut_to_the_box() {
    let source = Arc::new(FakeImageSource::new());
    let mut spec = spec("carol", String::new());
    spec.message = "hodl ".repeat(200);
    let badge = compositor(source).compose(&spec).await.unwrap();
    assert_eq!(badge.scene.lines.len(), 5);
    assert_eq!(badge.scene.timestamp, badge.scene.timestamp.trim());
}

#[tokio::test]
async fn download_uses_the_pledge_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let saver = DirectorySaver::new(dir.path());
    let source = Arc::new(FakeImageSource::new());
    let path = compositor(source)
        .download(&spec("alice", String::new()), &saver)
        .await
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "succinct-pledge-alice.png");
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 1440);
}

struct ReadOnlyDisk;

impl FileSaver for ReadOnlyDisk {
    fn save(&self, _file_name: &str, _bytes: &[u8]) -> std::io::Result<PathBuf> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ))
    }
}

#[tokio::test]
async fn save_failure_is_one_terminal_error() {
    let source = Arc::new(FakeImageSource::new());
    let err = compositor(source)
        .download(&spec("alice", String::new()), &ReadOnlyDisk)
        .await
        .unwrap_err();
    assert!(matches!(err, BadgeError::Save { .. }));
    assert_eq!(err.user_message(), "Could not generate badge. Please try again.");
}

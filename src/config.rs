use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    pub width: f32,
    pub height: f32,
    /// Pixel density multiplier applied when rasterizing.
    pub scale: f32,
    /// Logo location: URL, data URL, or path relative to `asset_dir`.
    pub logo: String,
    pub asset_dir: PathBuf,
    pub logo_target_height: f32,
    pub logo_max_width: f32,
    pub logo_timeout_ms: u64,
    pub embedded_timeout_ms: u64,
    pub file_prefix: String,
    pub fast_text_metrics: bool,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 720.0,
            scale: 3.0,
            logo: "succinct-logo.png".to_string(),
            asset_dir: PathBuf::from("."),
            logo_target_height: 32.0,
            logo_max_width: 240.0,
            logo_timeout_ms: 10_000,
            embedded_timeout_ms: 5_000,
            file_prefix: "succinct-pledge-".to_string(),
            fast_text_metrics: false,
        }
    }
}

impl BadgeConfig {
    pub fn logo_timeout(&self) -> Duration {
        Duration::from_millis(self.logo_timeout_ms)
    }

    pub fn embedded_timeout(&self) -> Duration {
        Duration::from_millis(self.embedded_timeout_ms)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width * self.scale).round() as u32,
            (self.height * self.scale).round() as u32,
        )
    }

    /// Download name for a badge: `{prefix}{username}.png`. Letters and digits
    /// in any script are kept; separators and other punctuation become `_`.
    pub fn file_name(&self, username: &str) -> String {
        let safe: String = username
            .chars()
            .map(|ch| {
                if ch.is_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}.png", self.file_prefix, safe)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Ordered avatar URL templates; `{username}` is substituted.
    pub templates: Vec<String>,
    pub candidate_timeout_ms: u64,
    /// Images must be strictly larger than this on both axes.
    pub min_dimension: u32,
    pub min_username_len: usize,
    pub debounce_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            templates: vec![
                "https://unavatar.io/x/{username}".to_string(),
                "https://unavatar.io/github/{username}".to_string(),
                "https://github.com/{username}.png".to_string(),
            ],
            candidate_timeout_ms: 3_000,
            min_dimension: 10,
            min_username_len: 2,
            debounce_ms: 300,
        }
    }
}

impl ResolverConfig {
    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.candidate_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub max_nodes: usize,
    pub pledges_per_cluster: usize,
    pub max_clusters: usize,
    pub cluster_radius: (f32, f32),
    pub cluster_jitter: f32,
    pub node_radius: (f32, f32),
    pub node_jitter: f32,
    pub min_separation: f32,
    pub max_attempts: usize,
    /// Keeps nodes away from the container edge, in percent units.
    pub padding: f32,
    pub intra_links: (usize, usize),
    pub bridge_probability: f64,
    pub bridge_links: (usize, usize),
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_nodes: 20,
            pledges_per_cluster: 5,
            max_clusters: 4,
            cluster_radius: (25.0, 40.0),
            cluster_jitter: 5.0,
            node_radius: (4.0, 12.0),
            node_jitter: 3.0,
            min_separation: 8.0,
            max_attempts: 50,
            padding: 5.0,
            intra_links: (2, 3),
            bridge_probability: 0.7,
            bridge_links: (1, 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
    pub subscribe_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            subscribe_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
    pub allowed_prefix: String,
    pub cache_control: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            allowed_prefix: "https://unavatar.io/".to_string(),
            cache_control: "public, max-age=31536000, immutable".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub badge: BadgeConfig,
    pub resolver: ResolverConfig,
    pub network: NetworkConfig,
    pub store: StoreConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    background_start: Option<String>,
    background_end: Option<String>,
    border_color: Option<String>,
    text_color: Option<String>,
    caption_color: Option<String>,
    accent_color: Option<String>,
    stamp_color: Option<String>,
    fallback_start: Option<String>,
    fallback_end: Option<String>,
    cluster_colors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    badge: Option<BadgeConfig>,
    resolver: Option<ResolverConfig>,
    network: Option<NetworkConfig>,
    store: Option<StoreConfig>,
    proxy: Option<ProxyConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document; present sections replace the defaults,
/// missing fields inside a section keep their default values.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "succinct" | "default" => config.theme = Theme::succinct(),
            "midnight" => config.theme = Theme::midnight(),
            other => anyhow::bail!("unknown theme {other:?}"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.background_start {
            theme.background_start = v;
        }
        if let Some(v) = vars.background_end {
            theme.background_end = v;
        }
        if let Some(v) = vars.border_color {
            theme.border_color = v;
        }
        if let Some(v) = vars.text_color {
            theme.text_color = v;
        }
        if let Some(v) = vars.caption_color {
            theme.caption_color = v;
        }
        if let Some(v) = vars.accent_color {
            theme.accent_color = v;
        }
        if let Some(v) = vars.stamp_color {
            theme.stamp_color = v;
        }
        if let Some(v) = vars.fallback_start {
            theme.fallback_start = v;
        }
        if let Some(v) = vars.fallback_end {
            theme.fallback_end = v;
        }
        if let Some(v) = vars.cluster_colors {
            theme.cluster_colors = v;
        }
    }

    if let Some(badge) = parsed.badge {
        config.badge = badge;
    }
    if let Some(resolver) = parsed.resolver {
        config.resolver = resolver;
    }
    if let Some(network) = parsed.network {
        config.network = network;
    }
    if let Some(store) = parsed.store {
        config.store = store;
    }
    if let Some(proxy) = parsed.proxy {
        config.proxy = proxy;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_print_geometry() {
        let config = Config::default();
        assert_eq!(config.badge.pixel_size(), (1440, 2160));
        assert_eq!(config.resolver.templates.len(), 3);
        assert_eq!(config.network.max_nodes, 20);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = parse_config(
            r##"{
                // comments are fine
                badge: { scale: 2, logo: "logo.png" },
                resolver: { candidate_timeout_ms: 500 },
                themeVariables: { accentColor: "#FF0000" },
            }"##,
        )
        .unwrap();
        assert_eq!(config.badge.scale, 2.0);
        assert_eq!(config.badge.width, 480.0);
        assert_eq!(config.badge.logo, "logo.png");
        assert_eq!(config.resolver.candidate_timeout(), Duration::from_millis(500));
        assert_eq!(config.resolver.min_dimension, 10);
        assert_eq!(config.theme.accent_color, "#FF0000");
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(parse_config(r#"{ theme: "neon" }"#).is_err());
    }

    #[test]
    fn file_name_is_single_component() {
        let badge = BadgeConfig::default();
        assert_eq!(badge.file_name("alice"), "succinct-pledge-alice.png");
        assert_eq!(badge.file_name("../x y"), "succinct-pledge-.._x_y.png");
    }

    #[test]
    fn file_name_keeps_non_ascii_letters() {
        let badge = BadgeConfig::default();
        assert_eq!(badge.file_name("josé"), "succinct-pledge-josé.png");
        assert_eq!(badge.file_name("日本"), "succinct-pledge-日本.png");
        assert_eq!(badge.file_name("a/b\\c"), "succinct-pledge-a_b_c.png");
    }
}

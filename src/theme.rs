use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub background_start: String,
    pub background_end: String,
    pub border_color: String,
    pub glow_color: String,
    pub text_color: String,
    pub caption_color: String,
    pub accent_color: String,
    pub stamp_color: String,
    pub profile_border_color: String,
    pub message_box_fill: String,
    pub message_box_stroke: String,
    pub watermark_color: String,
    pub fallback_start: String,
    pub fallback_end: String,
    pub cluster_colors: Vec<String>,
    pub intra_edge_color: String,
    pub bridge_edge_color: String,
    pub network_background: String,
}

impl Theme {
    pub fn succinct() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            background_start: "#667eea".to_string(),
            background_end: "#764ba2".to_string(),
            border_color: "#8B45FF".to_string(),
            glow_color: "rgba(255, 255, 255, 0.3)".to_string(),
            text_color: "#FFFFFF".to_string(),
            caption_color: "#E5E7EB".to_string(),
            accent_color: "#C084FC".to_string(),
            stamp_color: "rgba(34, 197, 94, 0.9)".to_string(),
            profile_border_color: "rgba(255, 255, 255, 0.8)".to_string(),
            message_box_fill: "rgba(0, 0, 0, 0.4)".to_string(),
            message_box_stroke: "rgba(255, 255, 255, 0.3)".to_string(),
            watermark_color: "rgba(255, 255, 255, 0.4)".to_string(),
            fallback_start: "#8B45FF".to_string(),
            fallback_end: "#6366F1".to_string(),
            cluster_colors: vec![
                "#A855F7".to_string(),
                "#EC4899".to_string(),
                "#6366F1".to_string(),
                "#22C55E".to_string(),
            ],
            intra_edge_color: "rgba(255, 255, 255, 0.35)".to_string(),
            bridge_edge_color: "rgba(192, 132, 252, 0.5)".to_string(),
            network_background: "#1E1B4B".to_string(),
        }
    }

    /// Darker palette for embedding the gallery on light pages.
    pub fn midnight() -> Self {
        Self {
            background_start: "#1E1B4B".to_string(),
            background_end: "#312E81".to_string(),
            border_color: "#6366F1".to_string(),
            network_background: "#0F0A2E".to_string(),
            ..Self::succinct()
        }
    }

    pub fn cluster_color(&self, cluster: usize) -> &str {
        if self.cluster_colors.is_empty() {
            return self.border_color.as_str();
        }
        self.cluster_colors[cluster % self.cluster_colors.len()].as_str()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::succinct()
    }
}

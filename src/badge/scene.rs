use super::geometry::*;
use crate::image_source::LoadedImage;
use crate::text::escape_xml;
use crate::theme::Theme;

pub const WORDMARK: &str = "SUCCINCT";
pub const CAPTION: &str = "ALLEGIANCE PLEDGE";
pub const FOOTER: &str = "DIAMOND HANDS";
pub const STAMP: &str = "\u{2713} CERTIFIED";
/// Drawn in the profile circle when there is not even a username.
pub const GENERIC_GLYPH: &str = "PFP";

#[derive(Debug, Clone)]
pub enum HeaderLayer {
    Logo { image: LoadedImage, placement: LogoBox },
    Wordmark,
}

#[derive(Debug, Clone)]
pub enum ProfileLayer {
    /// Any raster (fetched avatar, upload, or the offscreen initials
    /// surface) clipped to the profile circle.
    Image { data_url: String },
    /// Vector initials; used only when the offscreen surface itself failed.
    Initials { text: String },
}

/// Everything the final composition needs once both loads have settled.
pub struct SceneInput<'a> {
    pub width: f32,
    pub height: f32,
    pub username: &'a str,
    pub lines: &'a [String],
    pub timestamp: &'a str,
    pub header: &'a HeaderLayer,
    pub profile: &'a ProfileLayer,
    pub theme: &'a Theme,
}

pub fn render_badge_svg(input: &SceneInput<'_>) -> String {
    let SceneInput {
        width,
        height,
        theme,
        ..
    } = *input;
    let center_x = width / 2.0;
    let font = escape_xml(&theme.font_family);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<linearGradient id=\"bg\" gradientUnits=\"userSpaceOnUse\" x1=\"0\" y1=\"0\" x2=\"{width}\" y2=\"{height}\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></linearGradient>",
        theme.background_start, theme.background_end
    ));
    svg.push_str(&format!(
        "<clipPath id=\"profile-clip\"><circle cx=\"{center_x:.2}\" cy=\"{PROFILE_CENTER_Y:.2}\" r=\"{PROFILE_RADIUS:.2}\"/></clipPath>",
    ));
    svg.push_str("</defs>");

    // 1. background
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"url(#bg)\"/>"
    ));

    // 2. borders
    svg.push_str(&format!(
        "<rect x=\"3\" y=\"3\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"6\"/>",
        width - 6.0,
        height - 6.0,
        theme.border_color
    ));
    svg.push_str(&format!(
        "<rect x=\"10\" y=\"10\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
        width - 20.0,
        height - 20.0,
        theme.glow_color
    ));

    // 3. header
    match input.header {
        HeaderLayer::Logo { image, placement } => {
            svg.push_str(&format!(
                "<image x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" opacity=\"0.9\" preserveAspectRatio=\"none\" xlink:href=\"{}\"/>",
                placement.x,
                placement.y,
                placement.width,
                placement.height,
                image.to_data_url()
            ));
            svg.push_str(&text_svg(
                center_x,
                placement.y + placement.height + CAPTION_GAP,
                CAPTION,
                TextStyle::bold(18.0, &theme.caption_color),
                &font,
            ));
        }
        HeaderLayer::Wordmark => {
            svg.push_str(&text_svg(
                center_x,
                WORDMARK_BASELINE,
                WORDMARK,
                TextStyle::bold(28.0, &theme.text_color),
                &font,
            ));
            svg.push_str(&text_svg(
                center_x,
                WORDMARK_CAPTION_BASELINE,
                CAPTION,
                TextStyle::bold(18.0, &theme.caption_color),
                &font,
            ));
        }
    }

    // 4. profile circle, border always on top
    let left = center_x - PROFILE_RADIUS;
    let top = PROFILE_CENTER_Y - PROFILE_RADIUS;
    let diameter = PROFILE_RADIUS * 2.0;
    match input.profile {
        ProfileLayer::Image { data_url } => {
            svg.push_str(&format!(
                "<image x=\"{left:.2}\" y=\"{top:.2}\" width=\"{diameter:.2}\" height=\"{diameter:.2}\" preserveAspectRatio=\"none\" clip-path=\"url(#profile-clip)\" xlink:href=\"{data_url}\"/>",
            ));
        }
        ProfileLayer::Initials { text } => {
            svg.push_str(&format!(
                "<circle cx=\"{center_x:.2}\" cy=\"{PROFILE_CENTER_Y:.2}\" r=\"{PROFILE_RADIUS:.2}\" fill=\"{}\"/>",
                theme.fallback_start
            ));
            svg.push_str(&text_svg(
                center_x,
                PROFILE_CENTER_Y,
                text,
                TextStyle::bold(48.0, &theme.text_color).centered_vertically(),
                &font,
            ));
        }
    }
    svg.push_str(&format!(
        "<circle cx=\"{center_x:.2}\" cy=\"{PROFILE_CENTER_Y:.2}\" r=\"{PROFILE_RADIUS:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"4\"/>",
        theme.profile_border_color
    ));

    // 5. username
    svg.push_str(&text_svg(
        center_x,
        USERNAME_BASELINE,
        input.username,
        TextStyle::bold(32.0, &theme.text_color),
        &font,
    ));

    // 6. message box
    svg.push_str(&format!(
        "<rect x=\"{BOX_X:.2}\" y=\"{BOX_Y:.2}\" width=\"{:.2}\" height=\"{BOX_HEIGHT:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        box_width(width),
        theme.message_box_fill,
        theme.message_box_stroke
    ));
    for (idx, line) in input.lines.iter().enumerate() {
        let y = MESSAGE_FIRST_BASELINE + idx as f32 * MESSAGE_LINE_HEIGHT;
        svg.push_str(&text_svg(
            MESSAGE_X,
            y,
            line,
            TextStyle::regular(MESSAGE_FONT_SIZE, &theme.caption_color).anchored("start"),
            &font,
        ));
    }

    // 7. timestamp + footer
    svg.push_str(&text_svg(
        center_x,
        TIMESTAMP_BASELINE,
        input.timestamp,
        TextStyle::regular(14.0, &theme.accent_color),
        &font,
    ));
    svg.push_str(&text_svg(
        center_x,
        FOOTER_BASELINE,
        FOOTER,
        TextStyle::bold(14.0, &theme.accent_color),
        &font,
    ));

    // 8. certified stamp
    svg.push_str(&format!(
        "<g transform=\"translate({STAMP_X} {STAMP_Y}) rotate({:.4})\">",
        STAMP_ROTATION_RAD.to_degrees()
    ));
    svg.push_str(&format!(
        "<rect x=\"-35\" y=\"-12\" width=\"70\" height=\"24\" fill=\"{}\"/>",
        theme.stamp_color
    ));
    svg.push_str(&text_svg(
        0.0,
        5.0,
        STAMP,
        TextStyle::bold(12.0, &theme.text_color),
        &font,
    ));
    svg.push_str("</g>");

    // 9. watermark
    svg.push_str(&text_svg(
        width - WATERMARK_INSET,
        height - WATERMARK_INSET,
        &format!("@{}", input.username),
        TextStyle::regular(12.0, &theme.watermark_color).anchored("end"),
        &font,
    ));

    svg.push_str("</svg>");
    svg
}

/// Content of the offscreen surface the initials fallback is painted on.
pub fn render_initials_svg(initials: &str, theme: &Theme) -> String {
    let size = FALLBACK_SIZE;
    let half = size / 2.0;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">",
    ));
    svg.push_str(&format!(
        "<defs><radialGradient id=\"fallback\" gradientUnits=\"userSpaceOnUse\" cx=\"{half}\" cy=\"{half}\" r=\"{half}\" fx=\"{half}\" fy=\"{half}\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></radialGradient></defs>",
        theme.fallback_start, theme.fallback_end
    ));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{size}\" height=\"{size}\" fill=\"url(#fallback)\"/>"
    ));
    svg.push_str(&text_svg(
        half,
        half,
        initials,
        TextStyle::bold(48.0, &theme.text_color).centered_vertically(),
        &escape_xml(&theme.font_family),
    ));
    svg.push_str("</svg>");
    svg
}

struct TextStyle<'a> {
    size: f32,
    bold: bool,
    fill: &'a str,
    anchor: &'static str,
    central: bool,
}

impl<'a> TextStyle<'a> {
    fn regular(size: f32, fill: &'a str) -> Self {
        Self {
            size,
            bold: false,
            fill,
            anchor: "middle",
            central: false,
        }
    }

    fn bold(size: f32, fill: &'a str) -> Self {
        Self {
            bold: true,
            ..Self::regular(size, fill)
        }
    }

    fn anchored(mut self, anchor: &'static str) -> Self {
        self.anchor = anchor;
        self
    }

    fn centered_vertically(mut self) -> Self {
        self.central = true;
        self
    }
}

fn text_svg(x: f32, y: f32, content: &str, style: TextStyle<'_>, font: &str) -> String {
    let weight = if style.bold { " font-weight=\"bold\"" } else { "" };
    let baseline = if style.central {
        " dominant-baseline=\"central\""
    } else {
        ""
    };
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{}\" font-family=\"{font}\" font-size=\"{}\"{weight}{baseline} fill=\"{}\">{}</text>",
        style.anchor,
        style.size,
        style.fill,
        escape_xml(content)
    )
}

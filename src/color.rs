use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use csscolorparser::Color as CssColor;
use tower_lsp::lsp_types::{Color, CompletionItemKind};

use crate::error::LookupError;

const PREVIEW_WIDTH: u32 = 200;
const PREVIEW_HEIGHT: u32 = 100;

/// Parse a CSS color literal into an LSP Color
pub fn parse_color(value: &str) -> Result<Color, LookupError> {
    let value = value.trim();
    let lower = value.to_lowercase();
    let malformed = || LookupError::MalformedColorValue {
        value: value.to_string(),
    };

    // Try hex color
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(malformed);
    }

    // Try rgb/rgba
    if lower.starts_with("rgb") {
        return parse_rgb(&lower)
            .or_else(|| parse_csscolorparser(value))
            .ok_or_else(malformed);
    }

    // csscolorparser reads bare hex digits as a color, so "100" or "fade" would pass
    if lower.is_empty()
        || !lower.starts_with(|c: char| c.is_ascii_alphabetic())
        || lower.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(malformed());
    }

    // Named colors and the remaining color functions (hsl, hwb, lab, ...)
    parse_csscolorparser(value).ok_or_else(malformed)
}

pub fn is_color(value: &str) -> bool {
    parse_color(value).is_ok()
}

/// Completion kind for a declared value: a swatch for colors, a variable otherwise
pub fn value_kind(value: &str) -> CompletionItemKind {
    if is_color(value) {
        CompletionItemKind::COLOR
    } else {
        CompletionItemKind::VARIABLE
    }
}

fn parse_csscolorparser(value: &str) -> Option<Color> {
    let parsed: CssColor = value.parse().ok()?;
    Some(Color {
        red: parsed.r as f32,
        green: parsed.g as f32,
        blue: parsed.b as f32,
        alpha: parsed.a as f32,
    })
}

fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.trim();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |s: &str| -> Option<f32> {
        let s = if s.len() == 1 { s.repeat(2) } else { s.to_string() };
        Some(u8::from_str_radix(&s, 16).ok()? as f32 / 255.0)
    };

    let (r, g, b, a) = match hex.len() {
        // #RGB and #RGBA
        3 | 4 => (
            channel(&hex[0..1])?,
            channel(&hex[1..2])?,
            channel(&hex[2..3])?,
            if hex.len() == 4 { channel(&hex[3..4])? } else { 1.0 },
        ),
        // #RRGGBB and #RRGGBBAA
        6 | 8 => (
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            if hex.len() == 8 { channel(&hex[6..8])? } else { 1.0 },
        ),
        _ => return None,
    };

    Some(Color {
        red: r,
        green: g,
        blue: b,
        alpha: a,
    })
}

fn parse_rgb(value: &str) -> Option<Color> {
    let inner = if let Some(rest) = value.strip_prefix("rgba") {
        rest
    } else if let Some(rest) = value.strip_prefix("rgb") {
        rest
    } else {
        return None;
    };

    let inner = inner.trim_start().strip_prefix('(')?.strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(|s| s.trim()).collect();

    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }

    let parse_channel = |part: &str| -> Option<f32> {
        if let Some(pct) = part.strip_suffix('%') {
            let value = pct.trim().parse::<f32>().ok()?;
            return Some((value / 100.0).clamp(0.0, 1.0));
        }
        let value = part.parse::<f32>().ok()?;
        Some((value / 255.0).clamp(0.0, 1.0))
    };

    let parse_alpha = |part: &str| -> Option<f32> {
        if let Some(pct) = part.strip_suffix('%') {
            let value = pct.trim().parse::<f32>().ok()?;
            return Some((value / 100.0).clamp(0.0, 1.0));
        }
        Some(part.parse::<f32>().ok()?.clamp(0.0, 1.0))
    };

    let r = parse_channel(parts[0])?;
    let g = parse_channel(parts[1])?;
    let b = parse_channel(parts[2])?;
    let a = if parts.len() > 3 {
        parse_alpha(parts[3])?
    } else {
        1.0
    };

    Some(Color {
        red: r,
        green: g,
        blue: b,
        alpha: a,
    })
}

/// Render a hover preview for a declared value.
///
/// Colors become a markdown image whose source is an inline SVG swatch labelled
/// with the literal value. Anything else is returned unchanged.
pub fn render_preview(value: &str) -> String {
    match parse_color(value) {
        Ok(color) => format!("![]({})", svg_data_uri(&swatch_svg(value.trim(), color))),
        Err(_) => value.to_string(),
    }
}

/// Hover text for a declared value; the swatch is skipped when previews are off
pub fn build_hover_payload(value: &str, color_preview: bool) -> String {
    if color_preview {
        render_preview(value)
    } else {
        value.to_string()
    }
}

fn swatch_svg(literal: &str, color: Color) -> String {
    let escaped = escape_xml(literal);
    let label_fill = if relative_luminance(color) > 0.5 || color.alpha < 0.5 {
        "#000000"
    } else {
        "#ffffff"
    };

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<svg version="1.1" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">
  <rect x="0" y="0" rx="5" ry="5" width="{w}" height="{h}" fill="{fill}"/>
  <text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle" fill="{label_fill}">{label}</text>
</svg>
"#,
        w = PREVIEW_WIDTH,
        h = PREVIEW_HEIGHT,
        fill = escaped,
        label_fill = label_fill,
        label = escaped,
    )
}

fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn relative_luminance(color: Color) -> f32 {
    0.2126 * color.red + 0.7152 * color.green + 0.0722 * color.blue
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

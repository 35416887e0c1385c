use serde::{Deserialize, Deserializer, Serialize, Serializer};
use skia_safe::Color;

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex_color(input: &str) -> Result<Color, String> {
    let hex = input.trim().trim_start_matches('#');
    if !hex.is_ascii() || !matches!(hex.len(), 6 | 8) {
        return Err(format!(
            "invalid colour '{input}': expected #RRGGBB or #RRGGBBAA"
        ));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| format!("invalid colour '{input}': bad hex digit"))
    };
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Color::from_argb(a, r, g, b))
}

pub fn format_hex_color(color: Color) -> String {
    if color.a() == 255 {
        format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
    } else {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            color.r(),
            color.g(),
            color.b(),
            color.a()
        )
    }
}

pub(crate) fn serialize_color<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    format_hex_color(*color).serialize(serializer)
}

pub(crate) fn deserialize_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
    let hex = String::deserialize(deserializer)?;
    parse_hex_color(&hex).map_err(serde::de::Error::custom)
}

pub(crate) fn serialize_opt_color<S: Serializer>(
    color: &Option<Color>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    color.map(format_hex_color).serialize(serializer)
}

pub(crate) fn deserialize_opt_color<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Color>, D::Error> {
    let hex: Option<String> = Option::deserialize(deserializer)?;
    hex.map(|h| parse_hex_color(&h).map_err(serde::de::Error::custom))
        .transpose()
}

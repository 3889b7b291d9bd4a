use ratatui::style::{Color, Modifier, Style};

use crate::Config;

/// Parse a theme color: a name ("cyan", "darkgray"), `#RRGGBB`, `#RGB` or `rgb(r, g, b)`.
/// Unrecognized values fall back to white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();
    match s.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" | "lightgray" | "lightgrey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => parse_hex_color(&s)
            .or_else(|| parse_rgb_color(&s))
            .unwrap_or(Color::White),
    }
}

fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => {
            // #RGB expands each digit: 0xF -> 0xFF
            let (r, g, b) = (channel(0..1)?, channel(1..2)?, channel(2..3)?);
            Some(Color::Rgb(r << 4 | r, g << 4 | g, b << 4 | b))
        }
        _ => None,
    }
}

fn parse_rgb_color(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<u8> = content
        .split(',')
        .map(|p| p.trim().parse::<u8>().ok())
        .collect::<Option<_>>()?;
    match parts[..] {
        [r, g, b] => Some(Color::Rgb(r, g, b)),
        _ => None,
    }
}

/// Black or white text, whichever reads better on `background`
pub fn get_contrast_text_color(background: Color) -> Color {
    let dark = match background {
        Color::Rgb(r, g, b) => {
            // Rec. 709 luma on the raw channels
            let luma = 0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64;
            luma < 128.0
        }
        Color::Black | Color::Blue | Color::Magenta | Color::Red | Color::DarkGray => true,
        _ => false,
    };
    if dark { Color::White } else { Color::Black }
}

/// Resolved colors of the active theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
    pub accent: Color,
    pub tab_bg: Color,
}

impl Palette {
    pub fn from_config(config: &Config) -> Self {
        let theme = config.get_active_theme();
        let highlight_bg = parse_color(&theme.highlight_bg);
        Self {
            fg: parse_color(&theme.fg),
            bg: parse_color(&theme.bg),
            highlight_bg,
            highlight_fg: get_contrast_text_color(highlight_bg),
            accent: parse_color(&theme.accent),
            tab_bg: parse_color(&theme.tab_bg),
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.accent).bg(self.bg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Cyan", Color::Cyan)]
    #[case(" darkgrey ", Color::DarkGray)]
    #[case("#ff8000", Color::Rgb(255, 128, 0))]
    #[case("#0f0", Color::Rgb(0, 255, 0))]
    #[case("rgb(1, 2, 3)", Color::Rgb(1, 2, 3))]
    #[case("rgb(1,2)", Color::White)]
    #[case("#12345", Color::White)]
    #[case("chartreuse", Color::White)]
    fn parses_theme_colors(#[case] input: &str, #[case] expected: Color) {
        assert_eq!(parse_color(input), expected);
    }

    #[rstest]
    #[case(Color::Black, Color::White)]
    #[case(Color::Yellow, Color::Black)]
    #[case(Color::Rgb(20, 20, 40), Color::White)]
    #[case(Color::Rgb(240, 240, 200), Color::Black)]
    fn contrast_text(#[case] background: Color, #[case] expected: Color) {
        assert_eq!(get_contrast_text_color(background), expected);
    }
}

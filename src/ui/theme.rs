use std::fs;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeColors {
    pub bg: String,
    pub fg: String,
    pub dim: String,
    pub accent: String,
    pub border: String,
    pub header_bg: String,
    pub header_fg: String,
    pub success: String,
    pub error: String,
}

impl Theme {
    /// User themes (`<config>/vocadr/themes/<name>.toml`) shadow the two
    /// built-in palettes.
    pub fn load(name: &str) -> Option<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir
                .join("vocadr")
                .join("themes")
                .join(format!("{name}.toml"));
            if let Ok(content) = fs::read_to_string(&path)
                && let Ok(theme) = toml::from_str::<Theme>(&content)
            {
                return Some(theme);
            }
        }

        match name {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }

    fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            colors: ThemeColors {
                bg: "#1e1e2e".to_string(),
                fg: "#cdd6f4".to_string(),
                dim: "#585b70".to_string(),
                accent: "#89b4fa".to_string(),
                border: "#45475a".to_string(),
                header_bg: "#313244".to_string(),
                header_fg: "#cdd6f4".to_string(),
                success: "#a6e3a1".to_string(),
                error: "#f38ba8".to_string(),
            },
        }
    }

    fn light() -> Self {
        Self {
            name: "light".to_string(),
            colors: ThemeColors {
                bg: "#eff1f5".to_string(),
                fg: "#4c4f69".to_string(),
                dim: "#9ca0b0".to_string(),
                accent: "#1e66f5".to_string(),
                border: "#bcc0cc".to_string(),
                header_bg: "#dce0e8".to_string(),
                header_fg: "#4c4f69".to_string(),
                success: "#40a02b".to_string(),
                error: "#d20f39".to_string(),
            },
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl ThemeColors {
    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6
            && let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            )
        {
            return Color::Rgb(r, g, b);
        }
        Color::White
    }

    pub fn bg(&self) -> Color {
        Self::parse_color(&self.bg)
    }
    pub fn fg(&self) -> Color {
        Self::parse_color(&self.fg)
    }
    pub fn dim(&self) -> Color {
        Self::parse_color(&self.dim)
    }
    pub fn accent(&self) -> Color {
        Self::parse_color(&self.accent)
    }
    pub fn border(&self) -> Color {
        Self::parse_color(&self.border)
    }
    pub fn header_bg(&self) -> Color {
        Self::parse_color(&self.header_bg)
    }
    pub fn header_fg(&self) -> Color {
        Self::parse_color(&self.header_fg)
    }
    pub fn success(&self) -> Color {
        Self::parse_color(&self.success)
    }
    pub fn error(&self) -> Color {
        Self::parse_color(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_handles_hex_and_garbage() {
        assert_eq!(ThemeColors::parse_color("#ff0080"), Color::Rgb(255, 0, 128));
        assert_eq!(ThemeColors::parse_color("nonsense"), Color::White);
    }

    #[test]
    fn builtin_themes_load() {
        assert!(Theme::load("dark").is_some());
        assert!(Theme::load("light").is_some());
        assert!(Theme::load("no-such-theme").is_none());
    }
}

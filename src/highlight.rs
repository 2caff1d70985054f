use inksac::prelude::*;

use crate::terminal::Tone;

/// Renders console text as colour pairs when the terminal supports colour.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    color_support: ColorSupport,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    pub fn new() -> Self {
        let support = check_color_support().unwrap_or(ColorSupport::NoColor);
        Self {
            color_support: support,
        }
    }

    pub fn plain() -> Self {
        Self {
            color_support: ColorSupport::NoColor,
        }
    }

    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if matches!(self.color_support, ColorSupport::NoColor) {
            return text.to_string();
        }

        let style = match tone {
            Tone::Normal => return text.to_string(),
            Tone::Echo => Style::builder().foreground(Color::Cyan).bold().build(),
            Tone::Success => Style::builder().foreground(Color::Green).build(),
            Tone::Error => Style::builder().foreground(Color::Red).bold().build(),
            Tone::Hint => Style::builder()
                .foreground(Color::RGB(128, 128, 128))
                .build(),
        };
        text.style(style).to_string()
    }

    /// Verb in cyan, switches in yellow; used when redrawing the input line.
    pub fn highlight_command(&self, input: &str) -> String {
        if matches!(self.color_support, ColorSupport::NoColor) {
            return input.to_string();
        }

        let mut parts: Vec<String> = input.split(' ').map(String::from).collect();
        if parts.is_empty() || parts[0].is_empty() {
            return input.to_string();
        }

        let command_style = Style::builder().foreground(Color::Cyan).bold().build();
        parts[0] = parts[0].clone().style(command_style).to_string();

        for part in parts.iter_mut().skip(1) {
            if part.starts_with('/') && part.len() > 1 {
                let flag_style = Style::builder().foreground(Color::Yellow).build();
                *part = part.clone().style(flag_style).to_string();
            }
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_palette_is_identity() {
        let palette = Palette::plain();
        assert_eq!(palette.paint(Tone::Error, "boom"), "boom");
        assert_eq!(palette.highlight_command("LIST /all"), "LIST /all");
    }
}

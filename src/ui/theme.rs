use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for CLI report output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Section titles and the import banner
    pub title: Style,
    pub ok: Style,
    pub failure: Style,
    pub caution: Style,
    /// Leading status icons
    pub icon: Style,
    /// Row labels in summaries and `key: value` lines
    pub label: Style,
}

impl Theme {
    /// Colored only when `console` says stdout takes colors (tty, `NO_COLOR`, `CLICOLOR`)
    pub fn detect() -> Self {
        Self::with_colors(console::colors_enabled())
    }

    pub fn with_colors(enabled: bool) -> Self {
        let pick = |style: Style| if enabled { style } else { Style::new() };
        Self {
            title: pick(Style::new().cyan().bold()),
            ok: pick(Style::new().green().bold()),
            failure: pick(Style::new().red().bold()),
            caution: pick(Style::new().yellow().bold()),
            icon: pick(Style::new().magenta()),
            label: pick(Style::new().white().dimmed()),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let plain = Theme::with_colors(false);
        assert_eq!("Booths:".style(plain.label).to_string(), "Booths:");

        let colored = Theme::with_colors(true);
        assert!("Booths:".style(colored.label).to_string().contains('\u{1b}'));
    }
}

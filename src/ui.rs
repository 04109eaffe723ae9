// UI layer: terminal rendering and the interactive credential prompt.
// Color is a `Palette` value handed to every renderer, so turning it off is
// a matter of building a different palette.

use crate::api::CredentialPrompt;
use crate::package::Package;
use crossterm::style::{Attribute, Color, ContentStyle, StyledContent};
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: bool,
}

impl Palette {
    pub fn new(colors: bool) -> Self {
        Palette { colors }
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    pub fn paint(&self, text: &str, fg: Color, bold: bool) -> String {
        if !self.colors {
            return text.to_string();
        }
        let mut style = ContentStyle::new();
        style.foreground_color = Some(fg);
        if bold {
            style.attributes.set(Attribute::Bold);
        }
        StyledContent::new(style, text).to_string()
    }

    fn line(&self, prefix: &str, fg: Color, text: &str) -> String {
        format!("{}{}\n", self.paint(prefix, fg, true), text)
    }

    /// Regular progress message.
    pub fn msg(&self, text: &str) -> String {
        self.line(":: ", Color::Green, text)
    }

    pub fn err(&self, text: &str) -> String {
        self.line(">> ", Color::Red, text)
    }
}

/// Current terminal width, 80 when it cannot be determined.
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .ok()
        .filter(|cols| *cols > 0)
        .unwrap_or(80)
}

/// Word-wrap `text` to `width` columns, every line indented by `indent`.
/// Words longer than a line are split.
pub fn wrap(text: &str, width: usize, indent: usize) -> String {
    let room = width.saturating_sub(indent).max(10);
    let pad = " ".repeat(indent);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > room {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..room).collect());
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > room && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|line| format!("{pad}{line}\n"))
        .collect()
}

/// Two-line summary used by search listings.
pub fn package_brief(palette: &Palette, pkg: &Package, width: usize) -> String {
    let version_color = if pkg.out_of_date { Color::Red } else { Color::Green };
    let flag = if pkg.out_of_date && !palette.colors() {
        " [Out Of Date]"
    } else {
        ""
    };
    format!(
        "{}/{} {}{}{}\n{}",
        palette.paint("aur", Color::Magenta, false),
        palette.paint(&pkg.name, Color::White, true),
        palette.paint(&pkg.version, version_color, true),
        flag,
        palette.paint(&format!(" |{}|", pkg.num_votes), Color::DarkGrey, true),
        wrap(&pkg.description, width, INDENT),
    )
}

/// `key : value` chart in the style of `pacman -Qi`.
pub fn info_chart(rows: &[(&str, String)], width: usize) -> String {
    const SEP: &str = " : ";
    let key_len = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let left = key_len + SEP.len();
    let mut chart = String::new();
    for (key, value) in rows {
        let block = wrap(value, width, left);
        chart.push_str(&format!("{key:<key_len$}{SEP}"));
        chart.push_str(block.trim_start_matches(' '));
    }
    chart
}

/// Chart rows for `info`.
pub fn info_rows(pkg: &Package, page: String) -> Vec<(&'static str, String)> {
    vec![
        ("Repository", "aur".to_string()),
        ("Name", pkg.name.clone()),
        ("Version", pkg.version.clone()),
        ("URL", pkg.url.clone()),
        ("AUR Page", page),
        ("Category", pkg.category.unwrap_or("None").to_string()),
        ("Licenses", pkg.license.clone()),
        ("NumVotes", pkg.num_votes.to_string()),
        ("Out-Of-Date", if pkg.out_of_date { "Yes" } else { "No" }.to_string()),
        ("Description", pkg.description.clone()),
    ]
}

/// Terminal prompt for credentials that were not given on the command line.
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn username(&self) -> anyhow::Result<String> {
        Ok(Input::<String>::new().with_prompt("Username").interact_text()?)
    }

    fn password(&self, username: &str) -> anyhow::Result<String> {
        Ok(Password::new()
            .with_prompt(format!("Password for {username}"))
            .interact()?)
    }
}

/// Spinner shown on stderr while a slow request runs.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

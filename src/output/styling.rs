use std::fmt::Display;

use console::{style, StyledObject};

/// Terminal colour helpers shared by the summary, banner and progress output
pub fn bright_yellow(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// `emoji title` line with the title underlined.
pub fn heading(emoji: &str, title: &str) -> String {
    format!("{} {}", bright(emoji), bright(title).underlined())
}

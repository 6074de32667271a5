use std::fmt::Display;

use console::{style, StyledObject};

/// Field name in a summary block.
pub fn label(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

/// Counts and other figures.
pub fn figure(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

/// Paths, windows and other locations the user may copy.
pub fn location(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn success(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

/// Green when nothing failed, red otherwise.
pub fn failures(count: usize) -> StyledObject<String> {
    if count == 0 {
        success(count)
    } else {
        style(count.to_string()).bright().red()
    }
}

/// `<emoji> <title>` with the title underlined.
pub fn heading(emoji: &str, title: &str) -> String {
    format!(
        "{} {}",
        style(emoji).bright(),
        style(title).bright().underlined()
    )
}

pub fn banner(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

//! Pure formatting functions for UI output.
//!
//! Everything here builds strings; writing them is left to [super::Terminal].

use console::style;

/// Line framing the release note preview.
pub const NOTE_SEPARATOR: &str = "====================================";

/// Usage line shown after usage errors.
pub const USAGE: &str = "usage: gdp deploy|publish [options]";

/// Closing line printed after a successful release.
pub const CLOSING_MESSAGE: &str =
    "Do not be satisfied with 'released', let's face user's feedback in sincerity!";

/// Question asked when a deploy runs outside the safety window.
pub const HOTFIX_QUESTION: &str = "It's past the regular time. Is this a hot-fix release?";

/// Answer printed when the hot-fix release is confirmed.
pub const HOTFIX_CONFIRMED: &str = "OK. Take time.";

/// Format a success message in green.
pub fn format_success(message: &str) -> String {
    style(message).green().to_string()
}

/// Format an error message with a red prefix, styled for stderr.
pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().for_stderr(), message)
}

/// Format a status message with a yellow arrow.
pub fn format_status(message: &str) -> String {
    format!("{} {}", style("→").yellow(), message)
}

/// Frame a release note for preview.
///
/// The note itself is left untouched so the preview matches what is published.
pub fn format_release_note(note: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        style("The release note is as follows.").bold(),
        NOTE_SEPARATOR,
        note,
        NOTE_SEPARATOR
    )
}

//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - the [Terminal] owning the input, output and error streams

use std::io::{self, Read, Write};

use crate::error::{DeclineReason, GdpError, Result};

pub mod formatter;

pub use formatter::{
    format_error, format_release_note, format_status, format_success, CLOSING_MESSAGE, USAGE,
};

/// Input, output and error streams of one invocation.
///
/// Success text goes to `out`, error text to `err`; `input` is only read by
/// the hot-fix confirmation.
pub struct Terminal<R, O, E> {
    input: R,
    out: O,
    err: E,
}

impl Terminal<io::Stdin, io::Stdout, io::Stderr> {
    /// Terminal bound to the process's standard streams.
    pub fn stdio() -> Self {
        Terminal::new(io::stdin(), io::stdout(), io::stderr())
    }
}

impl<R: Read, O: Write, E: Write> Terminal<R, O, E> {
    pub fn new(input: R, out: O, err: E) -> Self {
        Terminal { input, out, err }
    }

    /// Print a plain line to standard output.
    pub fn display(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message)
    }

    pub fn display_success(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", format_success(message))
    }

    pub fn display_status(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", format_status(message))
    }

    pub fn display_error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "{}", format_error(message))
    }

    pub fn display_release_note(&mut self, note: &str) -> io::Result<()> {
        writeln!(self.out, "{}", format_release_note(note))
    }

    /// Report a failed invocation, followed by the usage line for usage errors.
    pub fn display_failure(&mut self, error: &GdpError) -> io::Result<()> {
        self.display_error(&error.to_string())?;
        if error.is_usage() {
            writeln!(self.err, "{}", USAGE)?;
        }
        Ok(())
    }

    /// Asks whether an out-of-hours deploy is a hot-fix.
    ///
    /// Reads exactly one byte: `y`/`Y` confirms, everything else (including
    /// end of input) declines. There is no retry.
    pub fn confirm_hotfix(&mut self) -> Result<()> {
        writeln!(self.out, "{}", formatter::HOTFIX_QUESTION)?;
        write!(self.out, "> ")?;
        self.out.flush()?;

        let mut answer = [0u8; 1];
        if self.input.read(&mut answer)? == 0 {
            return Err(DeclineReason::NoAnswer.into());
        }

        match answer[0] {
            b'y' | b'Y' => {
                writeln!(self.out, "{}", formatter::HOTFIX_CONFIRMED)?;
                Ok(())
            }
            b'n' | b'N' => Err(DeclineReason::Declined.into()),
            _ => Err(DeclineReason::Unrecognized.into()),
        }
    }

    /// Give back the streams, e.g. to inspect captured output in tests.
    pub fn into_parts(self) -> (R, O, E) {
        (self.input, self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn terminal(input: &'static [u8]) -> Terminal<Cursor<&'static [u8]>, Vec<u8>, Vec<u8>> {
        Terminal::new(Cursor::new(input), Vec::new(), Vec::new())
    }

    fn text(bytes: Vec<u8>) -> String {
        console::strip_ansi_codes(&String::from_utf8(bytes).unwrap()).to_string()
    }

    #[test]
    fn test_confirm_hotfix_accepts_y() {
        for input in [&b"y"[..], &b"Y\n"[..]] {
            let mut terminal = terminal(input);
            assert!(terminal.confirm_hotfix().is_ok());

            let (_, out, _) = terminal.into_parts();
            let out = text(out);
            assert!(out.contains("Is this a hot-fix release?"));
            assert!(out.contains("OK. Take time."));
        }
    }

    #[test]
    fn test_confirm_hotfix_declines_n() {
        let mut terminal = terminal(b"n");
        assert!(matches!(
            terminal.confirm_hotfix(),
            Err(GdpError::UserDeclined(DeclineReason::Declined))
        ));
    }

    #[test]
    fn test_confirm_hotfix_reads_a_single_byte() {
        let mut terminal = terminal(b"yes");
        assert!(terminal.confirm_hotfix().is_ok());

        let (mut input, _, _) = terminal.into_parts();
        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "es");
    }

    #[test]
    fn test_confirm_hotfix_unrecognized_answer() {
        let mut terminal = terminal(b"\n");
        let err = terminal.confirm_hotfix().unwrap_err();
        assert_eq!(err.to_string(), "Please enter y or n.");
    }

    #[test]
    fn test_confirm_hotfix_end_of_input() {
        let mut terminal = terminal(b"");
        assert!(matches!(
            terminal.confirm_hotfix(),
            Err(GdpError::UserDeclined(DeclineReason::NoAnswer))
        ));
    }

    #[test]
    fn test_display_failure_prints_usage_for_usage_errors() {
        let mut terminal = terminal(b"");
        terminal
            .display_failure(&GdpError::usage("Invalid sub command."))
            .unwrap();

        let (_, out, err) = terminal.into_parts();
        assert!(out.is_empty());
        assert_eq!(
            text(err),
            "ERROR: Invalid sub command.\nusage: gdp deploy|publish [options]\n"
        );
    }
}

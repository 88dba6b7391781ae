//! User-facing progress output.
//!
//! Progress goes to stderr so stdout stays free; the sources file itself is
//! only ever written to the output path.

use camino::Utf8Path;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Generate the completion message for a written sources file.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use nuget_sources_generator::output::success_message;
///
/// let message = success_message(1, Utf8Path::new("nuget-sources.json"));
/// assert_eq!(message, "Wrote 1 source to nuget-sources.json");
/// ```
#[must_use]
pub fn success_message(count: usize, output: &Utf8Path) -> String {
    let noun = if count == 1 { "source" } else { "sources" };
    format!("Wrote {count} {noun} to {output}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::none(0, "Wrote 0 sources to out.json")]
    #[case::one(1, "Wrote 1 source to out.json")]
    #[case::many(8, "Wrote 8 sources to out.json")]
    fn success_message_pluralises(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(success_message(count, Utf8Path::new("out.json")), expected);
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}

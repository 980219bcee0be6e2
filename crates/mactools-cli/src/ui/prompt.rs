//! Confirmation prompts.

use crossterm::style::Stylize;
use std::io::{BufRead, Write};

/// Ask a y/N question on stdout and read the answer from stdin.
/// Anything but `y`/`yes` (case-insensitive) declines, including EOF.
pub fn confirm(question: &str) -> std::io::Result<bool> {
    print!("{} {question} (y/N) ", "?".bold().yellow());
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    let answer = input.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("YES"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}

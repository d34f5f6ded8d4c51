// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Interactive backup confirmation

use kvmigrate_migration::Confirmer;
use std::io::{self, BufRead, Write};

/// Line shown after an unrecognised answer
pub const INVALID_ANSWER: &str = "Invalid input. Please enter 'y' or 'n'.";

/// Asks a yes/no question on `output` and reads answers from `input`
///
/// Answers are case-insensitive `y`, `yes`, `n` or `no`; anything else
/// repeats the question. End of input is an error.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Create a prompt over the given streams
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirmer for LinePrompt<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let mut line = String::new();
        loop {
            write!(self.output, "{question} (y/n): ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before an answer was given",
                ));
            }

            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "{INVALID_ANSWER}")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(input: &str) -> (io::Result<bool>, String) {
        let mut output = Vec::new();
        let answer = LinePrompt::new(Cursor::new(input.as_bytes()), &mut output).confirm("Backup?");
        (answer, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_accepts_yes_and_no_in_any_case() {
        for input in ["y\n", "Y\n", "yes\n", "YES\n", "  Yes  \n"] {
            assert!(ask(input).0.unwrap(), "{input:?}");
        }
        for input in ["n\n", "No\n", "NO\n"] {
            assert!(!ask(input).0.unwrap(), "{input:?}");
        }
    }

    #[test]
    fn test_reprompts_until_valid_answer() {
        let (answer, output) = ask("maybe\n\nyep\nn\n");
        assert!(!answer.unwrap());
        assert_eq!(output.matches("Backup? (y/n): ").count(), 4);
        assert_eq!(output.matches(INVALID_ANSWER).count(), 3);
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let (answer, _) = ask("perhaps\n");
        assert_eq!(answer.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_answer_without_trailing_newline() {
        assert!(ask("y").0.unwrap());
    }
}

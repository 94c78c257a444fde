//! Yes/no gates between pipeline stages

use std::io::{self, BufRead, Write};

/// Asks the operator whether to continue.
pub trait Confirm {
    /// `true` to proceed, `false` to stop cleanly.
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Approves every gate (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, prompt: &str) -> bool {
        tracing::info!("{prompt} (assumed yes)");
        true
    }
}

/// Interactive prompt on a line-oriented reader, normally stdin.
pub struct TerminalPrompt<R> {
    input: R,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    /// Prompt on the process' stdin.
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    /// Prompt reading answers from `input`.
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Confirm for TerminalPrompt<R> {
    fn confirm(&mut self, prompt: &str) -> bool {
        loop {
            tracing::info!("{prompt}");
            print!("Enter (Y)es/(N)o:\t");
            let _ = io::stdout().flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }

            match parse_answer(&line) {
                Some(answer) => return answer,
                None => tracing::error!("Invalid input. Please enter 'yes' or 'no'."),
            }
        }
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn accepts_yes_variants() {
        let mut prompt = TerminalPrompt::new(Cursor::new("YES\n"));
        assert!(prompt.confirm("Continue?"));
        let mut prompt = TerminalPrompt::new(Cursor::new("y\n"));
        assert!(prompt.confirm("Continue?"));
    }

    #[test]
    fn reprompts_until_valid() {
        let mut prompt = TerminalPrompt::new(Cursor::new("maybe\n\nN\n"));
        assert!(!prompt.confirm("Continue?"));
    }

    #[test]
    fn end_of_input_declines() {
        let mut prompt = TerminalPrompt::new(Cursor::new("what\n"));
        assert!(!prompt.confirm("Continue?"));
    }

    #[test]
    fn closures_are_gates() {
        let mut asked = Vec::new();
        let mut gate = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };
        assert!(!gate.confirm("first"));
        drop(gate);
        assert_eq!(asked, vec!["first"]);
    }
}

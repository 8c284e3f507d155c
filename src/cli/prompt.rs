//! Interactive prompts on the controlling terminal.

use console::Term;

use scisummarize::state::Confirm;

/// Asks on stderr and reads a y/N answer; `--yes` skips the question.
pub struct TermConfirm {
    pub assume_yes: bool,
}

impl Confirm for TermConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let term = Term::stderr();
        if term.write_str(&format!("{} [y/N] ", prompt)).is_err() {
            return false;
        }
        match term.read_line() {
            Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Read a password without echo.
pub fn password(label: &str) -> std::io::Result<String> {
    let term = Term::stderr();
    term.write_str(&format!("{}: ", label))?;
    term.read_secure_line()
}

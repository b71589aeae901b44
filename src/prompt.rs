use std::io::{self, IsTerminal, Read};

use console::Term;

pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` declines.
pub fn confirm(question: &str) -> io::Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{question} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Read a message body from stdin, telling the user how to finish when
/// stdin is a terminal.
pub fn read_stdin(hint: &str) -> io::Result<String> {
    if stdin_is_terminal() {
        eprintln!("{hint} (finish with Ctrl-D)");
    }
    let mut body = String::new();
    io::stdin().read_to_string(&mut body)?;
    Ok(body)
}

//! Output formatting utilities for the CLI

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

/// Render a received message for the terminal
///
/// Valid UTF-8 is printed as-is. Anything else falls back to a lossy
/// conversion followed by the raw byte values, so binary payloads stay
/// inspectable.
pub fn format_message(message: &[u8]) -> String {
    match std::str::from_utf8(message) {
        Ok(text) => text.to_string(),
        Err(_) => format!("{} {:?}", String::from_utf8_lossy(message), message),
    }
}

/// Write `symbol msg` with the symbol in `color`
///
/// Terminal write failures are ignored; there is nowhere left to report them.
fn print_marked(mut out: impl std::io::Write, color: Color, symbol: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(symbol),
        Print(" "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Green checkmark on stdout
pub fn print_success(msg: &str) {
    print_marked(std::io::stdout(), Color::Green, "✓", msg);
}

/// Red cross on stderr
pub fn print_error(msg: &str) {
    print_marked(std::io::stderr(), Color::Red, "✗", msg);
}

/// Yellow warning sign on stderr
pub fn print_warning(msg: &str) {
    print_marked(std::io::stderr(), Color::Yellow, "⚠", msg);
}

/// Cyan info sign on stdout
pub fn print_info(msg: &str) {
    print_marked(std::io::stdout(), Color::Cyan, "ℹ", msg);
}

//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use lpf_core::ports::{NoticeLevel, Notifier};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Brazilian currency formatting: `R$ 1.234,56`
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.abs().round_dp(2);
    let text = format!("{:.2}", rounded);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, frac_part)
}

/// Prints import notices to the terminal
///
/// Silenced in `--json` mode so stdout stays machine-readable.
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        if self.quiet {
            return;
        }
        match level {
            NoticeLevel::Info => info(message),
            NoticeLevel::Success => success(message),
            NoticeLevel::Warning => warning(message),
            NoticeLevel::Error => error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(Decimal::from_str("1234.56").unwrap()), "R$ 1.234,56");
        assert_eq!(format_brl(Decimal::from_str("-50").unwrap()), "-R$ 50,00");
        assert_eq!(format_brl(Decimal::from_str("1000000").unwrap()), "R$ 1.000.000,00");
        assert_eq!(format_brl(Decimal::from_str("0.001").unwrap()), "R$ 0,00");
        assert_eq!(format_brl(Decimal::from_str("999.999").unwrap()), "R$ 1.000,00");
    }
}

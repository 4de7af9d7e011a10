//! Domain types for barstore

pub mod bar;

pub use bar::{PriceBar, StoredBar};

/// Ticker symbol type alias
pub type Ticker = String;

/// Canonicalize a user-supplied ticker: trim surrounding whitespace and upper-case.
///
/// Returns `None` for a blank symbol.
pub fn normalize_ticker(raw: &str) -> Option<Ticker> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_ticker("  aapl "), Some("AAPL".to_string()));
        assert_eq!(normalize_ticker("brk.b"), Some("BRK.B".to_string()));
    }

    #[test]
    fn normalize_rejects_blank() {
        assert_eq!(normalize_ticker("   "), None);
        assert_eq!(normalize_ticker(""), None);
    }
}

//! Human-legible business identifiers
//!
//! Format: `<PREFIX><YYYYMMDDHHMMSS><NNNNNN>` where the six trailing digits
//! are a process-wide wrapping sequence (3 digits) followed by 3 random
//! digits. Unique in practice for the expected request rate; not a
//! cryptographic guarantee.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;

pub const TRANSACTION_PREFIX: &str = "TXN";
pub const ACCOUNT_PREFIX: &str = "ACC";
pub const LOAN_PREFIX: &str = "LOAN";

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Format an identifier for a given instant and disambiguator
pub fn format_identifier(prefix: &str, at: DateTime<Utc>, disambiguator: u32) -> String {
    format!(
        "{}{}{:06}",
        prefix,
        at.format("%Y%m%d%H%M%S"),
        disambiguator % 1_000_000
    )
}

fn next_disambiguator() -> u32 {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1000;
    let salt = rand::thread_rng().gen_range(0..1000);
    seq * 1000 + salt
}

fn generate(prefix: &str) -> String {
    format_identifier(prefix, Utc::now(), next_disambiguator())
}

pub fn transaction_id() -> String {
    generate(TRANSACTION_PREFIX)
}

pub fn account_number() -> String {
    generate(ACCOUNT_PREFIX)
}

pub fn loan_number() -> String {
    generate(LOAN_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_format_identifier() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_identifier("TXN", at, 42), "TXN20240309070501000042");
        assert_eq!(format_identifier("LOAN", at, 1_234_567), "LOAN20240309070501234567");
    }

    #[test]
    fn test_transaction_id_shape() {
        let id = transaction_id();
        assert!(id.starts_with("TXN"));
        assert_eq!(id.len(), 3 + 14 + 6);
        assert!(id[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_ids_distinct_within_one_burst() {
        let ids: HashSet<String> = (0..500).map(|_| transaction_id()).collect();
        assert_eq!(ids.len(), 500);
    }
}

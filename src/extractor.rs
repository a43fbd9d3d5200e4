//! Announcement Address Extraction
//!
//! Turns the raw text of a channel message into at most one token candidate.
//! Priority is fixed: an exchange link (`outputCurrency=0x..`) beats a bare
//! address, and the leftmost bare address beats any later one. AMA
//! announcements are excluded outright, whatever addresses they carry.

use crate::types::TokenCandidate;
use alloy::primitives::Address;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;
use tracing::{debug, info};

static AMA_ANNOUNCEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAMA\s+ANNOUNCEMENT").expect("valid AMA pattern"));

static LINKED_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"outputCurrency=(0[xX][0-9a-fA-F]{40})\b").expect("valid link pattern")
});

// Word boundaries keep us from slicing 40 chars out of a tx hash
static BARE_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0[xX][0-9a-fA-F]{40}\b").expect("valid address pattern"));

/// Where a candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    ExchangeLink,
    BareAddress,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddressExtractor;

impl AddressExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the candidate token, if any.
    pub fn extract(&self, text: &str) -> Option<TokenCandidate> {
        self.extract_with_origin(text).map(|(candidate, _)| candidate)
    }

    pub fn extract_with_origin(&self, text: &str) -> Option<(TokenCandidate, CandidateOrigin)> {
        if is_ama_announcement(text) {
            info!("Message is an AMA announcement, ignoring");
            return None;
        }

        if let Some(caps) = LINKED_ADDRESS.captures(text) {
            if let Some(candidate) = caps.get(1).and_then(|m| to_candidate(m.as_str())) {
                info!(token = %candidate, "Token found in exchange link");
                return Some((candidate, CandidateOrigin::ExchangeLink));
            }
        }

        if let Some(m) = BARE_ADDRESS.find(text) {
            if let Some(candidate) = to_candidate(m.as_str()) {
                info!(token = %candidate, "Token found");
                return Some((candidate, CandidateOrigin::BareAddress));
            }
        }

        debug!("No token address in message");
        None
    }
}

pub fn is_ama_announcement(text: &str) -> bool {
    AMA_ANNOUNCEMENT.is_match(text)
}

fn to_candidate(raw: &str) -> Option<TokenCandidate> {
    // Uppercase 0X prefix is accepted by the patterns, not by the parser
    let normalized = format!("0x{}", &raw[2..]);
    Address::from_str(&normalized).ok().map(TokenCandidate::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const LINKED: &str = "0xAbCdEf0123456789aBcDEF0123456789abcDEF01";
    const BARE: &str = "0x1111111111111111111111111111111111111111";

    fn extract(text: &str) -> Option<Address> {
        AddressExtractor::new().extract(text).map(|c| c.address())
    }

    #[test]
    fn test_linked_address_in_announcement() {
        let text = format!("new gem! outputCurrency={} don't miss it", LINKED);
        assert_eq!(
            extract(&text),
            Some(address!("AbCdEf0123456789aBcDEF0123456789abcDEF01"))
        );
    }

    #[test]
    fn test_linked_address_beats_earlier_bare_address() {
        let text = format!(
            "CA {} buy: https://pancakeswap.finance/swap?outputCurrency={}",
            BARE, LINKED
        );
        let (candidate, origin) = AddressExtractor::new().extract_with_origin(&text).unwrap();
        assert_eq!(candidate.address(), Address::from_str(LINKED).unwrap());
        assert_eq!(origin, CandidateOrigin::ExchangeLink);
    }

    #[test]
    fn test_first_bare_address_wins() {
        let text = format!(
            "contract {} pair 0x2222222222222222222222222222222222222222",
            BARE
        );
        assert_eq!(extract(&text), Some(Address::repeat_byte(0x11)));
    }

    #[test]
    fn test_ama_announcement_excluded() {
        let text = format!("AMA ANNOUNCEMENT: join us at 5pm, CA {}", BARE);
        assert_eq!(extract(&text), None);

        let lower = format!("big ama announcement soon outputCurrency={}", LINKED);
        assert_eq!(extract(&lower), None);

        let mixed = format!("Ama  Announcement {}", BARE);
        assert_eq!(extract(&mixed), None);
    }

    #[test]
    fn test_ama_needs_word_boundary() {
        // "LLAMA" ends in AMA but is not the AMA keyword
        let text = format!("LLAMA announcement {}", BARE);
        assert_eq!(extract(&text), Some(Address::repeat_byte(0x11)));
    }

    #[test]
    fn test_no_address() {
        assert_eq!(extract("presale starts tomorrow, stay tuned"), None);
        assert_eq!(extract("short 0x1234 not an address"), None);
    }

    #[test]
    fn test_transaction_hash_is_not_an_address() {
        let text = "tx 0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";
        assert_eq!(extract(text), None);
    }

    #[test]
    fn test_uppercase_prefix_accepted() {
        let text = "CA: 0X1111111111111111111111111111111111111111";
        assert_eq!(extract(text), Some(Address::repeat_byte(0x11)));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login identifiers and wallet address derivation.
//!
//! A user logs in with an email address or a phone number. The first login
//! derives a secp256k1 key from the canonical identifier and keeps only the
//! resulting address.
//!
//! ## Derivation modes
//!
//! - `Deterministic`: seed = HMAC-SHA256(secret, identifier). If the seed is
//!   not a valid scalar a big-endian counter is appended and the MAC retried.
//!   The secret holder can rebuild the key for custodial signing.
//! - `Timestamped`: seed = keccak256(identifier ‖ unix millis). The key cannot
//!   be rebuilt later.

use std::fmt;

use alloy::{
    primitives::{keccak256, Address},
    signers::local::PrivateKeySigner,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use unicode_normalization::UnicodeNormalization;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on counter retries for invalid scalars. The chance of even
/// one retry is about 2^-128.
const MAX_DERIVATION_ATTEMPTS: u32 = 16;

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Email or phone number is required")]
    Empty,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid phone number")]
    InvalidPhone,
}

/// A normalized login identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

impl Identifier {
    /// Classify and canonicalize raw user input.
    ///
    /// Input is NFKC-normalized and trimmed. Anything containing `@` is
    /// treated as an email (lowercased); otherwise the input must be a phone
    /// number made of an optional leading `+` and 7 to 15 digits once spaces,
    /// dashes, dots and parentheses are removed.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let normalized: String = raw.nfkc().collect();
        let value = normalized.trim();
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if value.contains('@') {
            return parse_email(value).map(Identifier::Email);
        }
        parse_phone(value).map(Identifier::Phone)
    }

    /// The canonical string stored and fed into derivation.
    pub fn canonical(&self) -> &str {
        match self {
            Identifier::Email(v) | Identifier::Phone(v) => v,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Identifier::Email(v) => Some(v),
            Identifier::Phone(_) => None,
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Identifier::Phone(v) => Some(v),
            Identifier::Email(_) => None,
        }
    }

    /// Preferred username: the email local part, or the phone number.
    pub fn username_hint(&self) -> &str {
        match self {
            Identifier::Email(v) => v.split('@').next().unwrap_or(v),
            Identifier::Phone(v) => v,
        }
    }

    /// Redacted form for log lines.
    pub fn masked(&self) -> String {
        match self {
            Identifier::Email(v) => {
                let (local, domain) = v.split_once('@').unwrap_or((v, ""));
                let first: String = local.chars().take(1).collect();
                format!("{first}***@{domain}")
            }
            Identifier::Phone(v) => {
                let tail: String = v
                    .chars()
                    .rev()
                    .take(2)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("***{tail}")
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

fn parse_email(value: &str) -> Result<String, IdentifierError> {
    let (local, domain) = value.split_once('@').ok_or(IdentifierError::InvalidEmail)?;
    let valid = !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace);
    if !valid {
        return Err(IdentifierError::InvalidEmail);
    }
    Ok(value.to_lowercase())
}

fn parse_phone(value: &str) -> Result<String, IdentifierError> {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    let (plus, digits) = match compact.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", compact.as_str()),
    };
    if !digits.chars().all(|c| c.is_ascii_digit())
        || !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
    {
        return Err(IdentifierError::InvalidPhone);
    }
    Ok(format!("{plus}{digits}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMode {
    #[default]
    Deterministic,
    Timestamped,
}

impl DerivationMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Some(DerivationMode::Deterministic),
            "timestamped" => Some(DerivationMode::Timestamped),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("address derivation exhausted {0} attempts")]
    Exhausted(u32),
    #[error("keys derived in timestamped mode cannot be rebuilt")]
    NotReproducible,
    #[error("derived key rejected: {0}")]
    InvalidKey(String),
}

/// Derives wallet keys from login identifiers.
#[derive(Clone)]
pub struct AddressDeriver {
    secret: Vec<u8>,
    mode: DerivationMode,
}

impl fmt::Debug for AddressDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressDeriver")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl AddressDeriver {
    pub fn new(secret: impl Into<Vec<u8>>, mode: DerivationMode) -> Self {
        Self {
            secret: secret.into(),
            mode,
        }
    }

    pub fn mode(&self) -> DerivationMode {
        self.mode
    }

    /// Derive the address for a first-time identifier.
    pub fn derive(&self, identifier: &Identifier) -> Result<Address, DerivationError> {
        let signer = match self.mode {
            DerivationMode::Deterministic => self.deterministic_signer(identifier)?,
            DerivationMode::Timestamped => {
                let millis = chrono::Utc::now().timestamp_millis();
                timestamped_signer(identifier, millis)?
            }
        };
        Ok(signer.address())
    }

    /// Rebuild the signing key for an identifier (deterministic mode only).
    pub fn signer_for(&self, identifier: &Identifier) -> Result<PrivateKeySigner, DerivationError> {
        match self.mode {
            DerivationMode::Deterministic => self.deterministic_signer(identifier),
            DerivationMode::Timestamped => Err(DerivationError::NotReproducible),
        }
    }

    fn deterministic_signer(
        &self,
        identifier: &Identifier,
    ) -> Result<PrivateKeySigner, DerivationError> {
        for counter in 0..MAX_DERIVATION_ATTEMPTS {
            let mut mac = HmacSha256::new_from_slice(&self.secret)
                .map_err(|e| DerivationError::InvalidKey(e.to_string()))?;
            mac.update(identifier.canonical().as_bytes());
            if counter > 0 {
                mac.update(&counter.to_be_bytes());
            }
            let seed = mac.finalize().into_bytes();
            if let Ok(signer) = PrivateKeySigner::from_slice(&seed) {
                return Ok(signer);
            }
            tracing::debug!(counter, "derived seed outside scalar range, retrying");
        }
        Err(DerivationError::Exhausted(MAX_DERIVATION_ATTEMPTS))
    }
}

fn timestamped_signer(
    identifier: &Identifier,
    unix_millis: i64,
) -> Result<PrivateKeySigner, DerivationError> {
    let material = format!("{}{}", identifier.canonical(), unix_millis);
    let seed = keccak256(material.as_bytes());
    PrivateKeySigner::from_slice(seed.as_slice())
        .map_err(|e| DerivationError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_lowercases_email() {
        let id = Identifier::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(id, Identifier::Email("alice@example.com".into()));
        assert_eq!(id.username_hint(), "alice");
        assert_eq!(id.email(), Some("alice@example.com"));
        assert_eq!(id.phone(), None);
    }

    #[test]
    fn normalizes_fullwidth_input() {
        // Fullwidth digits collapse to ASCII under NFKC.
        let id = Identifier::parse("＋２５６ ７００ １２３ ４５６").unwrap();
        assert_eq!(id, Identifier::Phone("+256700123456".into()));
    }

    #[test]
    fn parses_phone_with_separators() {
        let id = Identifier::parse("+1 (555) 010-9999").unwrap();
        assert_eq!(id.canonical(), "+15550109999");
        assert_eq!(id.username_hint(), "+15550109999");
    }

    #[test]
    fn rejects_invalid_identifiers() {
        assert_eq!(Identifier::parse("   "), Err(IdentifierError::Empty));
        assert_eq!(Identifier::parse("alice@"), Err(IdentifierError::InvalidEmail));
        assert_eq!(Identifier::parse("a@b@c.com"), Err(IdentifierError::InvalidEmail));
        assert_eq!(Identifier::parse("alice"), Err(IdentifierError::InvalidPhone));
        assert_eq!(Identifier::parse("12345"), Err(IdentifierError::InvalidPhone));
        assert_eq!(
            Identifier::parse("1234567890123456"),
            Err(IdentifierError::InvalidPhone)
        );
    }

    #[test]
    fn masks_identifiers() {
        let email = Identifier::parse("alice@example.com").unwrap();
        assert_eq!(email.masked(), "a***@example.com");
        let phone = Identifier::parse("+256700123456").unwrap();
        assert_eq!(phone.masked(), "***56");
    }

    #[test]
    fn deterministic_derivation_is_stable() {
        let deriver = AddressDeriver::new("secret", DerivationMode::Deterministic);
        let id = Identifier::parse("alice@example.com").unwrap();
        let first = deriver.derive(&id).unwrap();
        let second = deriver.derive(&id).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, Address::ZERO);

        let other = AddressDeriver::new("other", DerivationMode::Deterministic);
        assert_ne!(other.derive(&id).unwrap(), first);

        let bob = Identifier::parse("bob@example.com").unwrap();
        assert_ne!(deriver.derive(&bob).unwrap(), first);
    }

    #[test]
    fn signer_matches_derived_address() {
        let deriver = AddressDeriver::new("secret", DerivationMode::Deterministic);
        let id = Identifier::parse("+256700123456").unwrap();
        let signer = deriver.signer_for(&id).unwrap();
        assert_eq!(signer.address(), deriver.derive(&id).unwrap());
    }

    #[test]
    fn timestamped_mode_is_not_reproducible() {
        let deriver = AddressDeriver::new("", DerivationMode::Timestamped);
        let id = Identifier::parse("alice@example.com").unwrap();
        assert!(deriver.derive(&id).is_ok());
        assert!(matches!(
            deriver.signer_for(&id),
            Err(DerivationError::NotReproducible)
        ));

        let a = timestamped_signer(&id, 1_700_000_000_000).unwrap();
        let b = timestamped_signer(&id, 1_700_000_000_001).unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn parses_derivation_mode() {
        assert_eq!(
            DerivationMode::parse("Deterministic"),
            Some(DerivationMode::Deterministic)
        );
        assert_eq!(
            DerivationMode::parse("timestamped"),
            Some(DerivationMode::Timestamped)
        );
        assert_eq!(DerivationMode::parse("random"), None);
    }
}

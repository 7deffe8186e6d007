//! Idempotency key derivation
//!
//! A row with a non-blank client reference is identified by that reference,
//! trimmed and otherwise exact. A row without one is identified by a SHA-256
//! digest over its identifying fields:
//!
//! ```text
//! v1 ␟ sender name ␟ sender address ␟ receiver name ␟ receiver address
//!    ␟ item count ␟ total weight ␟ item description ␟ declared value
//! ```
//!
//! Text segments are trimmed, whitespace runs collapsed and lowercased;
//! decimals are normalized so `2.50` and `2.5` agree. Carrier, service type,
//! COD amount and special instructions are deliberately left out: two rows
//! that differ only there are the same order.

use crate::types::{IdempotencyKey, Scope, ValidatedRow};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Prefix of the canonical form; bump when the field set changes
const CANONICAL_VERSION: &str = "v1";

/// ASCII unit separator between canonical segments
const SEGMENT_SEPARATOR: char = '\u{1f}';

/// Stateless key resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotencyKeyResolver;

impl IdempotencyKeyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Derive the idempotency key of a validated row within `scope`
    pub fn resolve(&self, row: &ValidatedRow, scope: &Scope) -> IdempotencyKey {
        match row.details().client_reference.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => {
                IdempotencyKey::client_reference(scope.clone(), reference)
            }
            _ => IdempotencyKey::hash(scope.clone(), identity_digest(row)),
        }
    }
}

/// Canonical identity string of a row (exposed for diagnostics and tests)
pub fn canonical_identity(row: &ValidatedRow) -> String {
    let details = row.details();
    let segments = [
        CANONICAL_VERSION.to_string(),
        normalize_text(&details.sender.name),
        normalize_text(&details.sender.address),
        normalize_text(&details.receiver.name),
        normalize_text(&details.receiver.address),
        details.item_count.to_string(),
        normalize_decimal(Some(details.total_weight)),
        normalize_text(details.item_description.as_deref().unwrap_or_default()),
        normalize_decimal(details.declared_value),
    ];

    let mut canonical = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            canonical.push(SEGMENT_SEPARATOR);
        }
        canonical.push_str(segment);
    }
    canonical
}

fn identity_digest(row: &ValidatedRow) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_identity(row).as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_decimal(value: Option<Decimal>) -> String {
    value
        .map(|v| v.normalize().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RowValidator;
    use crate::types::{Column, IdempotencyBasis, RawRow};
    use rstest::rstest;

    fn row() -> RawRow {
        RawRow::new(1)
            .with(Column::SenderName, "Acme Warehouse")
            .with(Column::SenderContact, "9876543210")
            .with(Column::SenderAddress, "12 Industrial Estate, Pune")
            .with(Column::ReceiverName, "Jane Doe")
            .with(Column::ReceiverContact, "9876501234")
            .with(Column::ReceiverAddress, "221B Baker Street")
            .with(Column::ItemDescription, "Books")
            .with(Column::ItemCount, "2")
            .with(Column::TotalWeight, "1.50")
            .with(Column::DeclaredValue, "499")
    }

    fn resolve(raw: RawRow, scope: &str) -> IdempotencyKey {
        let validated = RowValidator::new().validate(raw).unwrap();
        IdempotencyKeyResolver::new().resolve(&validated, &Scope::new(scope))
    }

    #[test]
    fn test_client_reference_is_trimmed_and_case_preserved() {
        let key = resolve(row().with(Column::ClientReference, "  Ref-001 "), "acme");
        assert_eq!(key.basis, IdempotencyBasis::ClientReference);
        assert_eq!(key.value, "Ref-001");
        assert_eq!(key.scope, Scope::new("acme"));
    }

    #[test]
    fn test_client_reference_comparison_is_exact() {
        let upper = resolve(row().with(Column::ClientReference, "REF-001"), "acme");
        let lower = resolve(row().with(Column::ClientReference, "ref-001"), "acme");
        assert_ne!(upper, lower);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::blank(Some("    "))]
    fn test_missing_reference_falls_back_to_hash(#[case] reference: Option<&str>) {
        let mut raw = row();
        raw.client_reference = reference.map(str::to_string);
        let key = resolve(raw, "acme");
        assert_eq!(key.basis, IdempotencyBasis::Hash);
        assert_eq!(key.value.len(), 64);
        assert!(key.value.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(resolve(row(), "acme"), resolve(row(), "acme"));
    }

    #[test]
    fn test_hash_ignores_case_and_incidental_whitespace() {
        let noisy = row()
            .with(Column::SenderName, "  ACME   warehouse ")
            .with(Column::ReceiverAddress, "221b  BAKER street")
            .with(Column::ItemDescription, " books")
            .with(Column::TotalWeight, "1.5")
            .with(Column::DeclaredValue, "499.00");
        assert_eq!(resolve(row(), "acme").value, resolve(noisy, "acme").value);
    }

    #[rstest]
    #[case::carrier(Column::CarrierName, "Delhivery")]
    #[case::carrier_code(Column::CarrierCode, "DLV")]
    #[case::service(Column::ServiceType, "EXPRESS")]
    #[case::instructions(Column::SpecialInstructions, "Leave at the door")]
    #[case::cod(Column::CodAmount, "120")]
    #[case::receiver_contact(Column::ReceiverContact, "9999999999")]
    #[case::dimensions(Column::LengthCm, "30")]
    fn test_hash_ignores_non_identity_fields(#[case] column: Column, #[case] value: &str) {
        let baseline = resolve(row(), "acme");
        let varied = resolve(row().with(column, value), "acme");
        assert_eq!(baseline, varied);
    }

    #[rstest]
    #[case::sender_name(Column::SenderName, "Other Sender")]
    #[case::sender_address(Column::SenderAddress, "Somewhere else")]
    #[case::receiver_name(Column::ReceiverName, "John Doe")]
    #[case::receiver_address(Column::ReceiverAddress, "10 Downing Street")]
    #[case::item_count(Column::ItemCount, "3")]
    #[case::total_weight(Column::TotalWeight, "1.51")]
    #[case::description(Column::ItemDescription, "Toys")]
    #[case::declared_value(Column::DeclaredValue, "500")]
    fn test_hash_changes_with_identity_fields(#[case] column: Column, #[case] value: &str) {
        let baseline = resolve(row(), "acme");
        let varied = resolve(row().with(column, value), "acme");
        assert_ne!(baseline.value, varied.value);
    }

    #[test]
    fn test_absent_and_present_declared_value_differ() {
        let mut without = row();
        without.declared_value = None;
        assert_ne!(resolve(row(), "acme").value, resolve(without, "acme").value);
    }

    #[test]
    fn test_same_row_in_different_scopes() {
        let first = resolve(row(), "acme");
        let second = resolve(row(), "globex");
        assert_eq!(first.value, second.value);
        assert_ne!(first, second);
    }

    #[test]
    fn test_canonical_identity_layout() {
        let validated = RowValidator::new().validate(row()).unwrap();
        let canonical = canonical_identity(&validated);
        let segments: Vec<&str> = canonical.split(SEGMENT_SEPARATOR).collect();
        assert_eq!(
            segments,
            vec![
                "v1",
                "acme warehouse",
                "12 industrial estate, pune",
                "jane doe",
                "221b baker street",
                "2",
                "1.5",
                "books",
                "499",
            ]
        );
    }
}

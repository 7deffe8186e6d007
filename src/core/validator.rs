//! Row validation
//!
//! [`RowValidator`] turns a [`RawRow`] into a [`ValidatedRow`] or a complete
//! list of what is wrong with it. Every rule runs on every row (no fail-fast),
//! so an operator fixing a spreadsheet sees all problems at once.
//!
//! Validation is pure: no I/O, no shared state, deterministic. It is safe to
//! run concurrently on disjoint rows.

use crate::types::{
    Column, Dimensions, ErrorCode, FieldError, OrderDetails, Party, RawRow, RowIndex,
    ValidatedRow,
};
use rust_decimal::Decimal;
use std::str::FromStr;

const CONTACT_MIN_DIGITS: usize = 7;
const CONTACT_MAX_DIGITS: usize = 15;
const PINCODE_DIGITS: usize = 6;

/// Why a row was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub row_index: RowIndex,
    /// Never empty
    pub errors: Vec<FieldError>,
}

/// Stateless row validator
#[derive(Debug, Clone, Copy, Default)]
pub struct RowValidator;

impl RowValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate and type a row
    ///
    /// Mandatory: sender and receiver name, address and contact, item count
    /// (whole number > 0) and total weight (> 0). Everything else is optional
    /// but must be well-formed when present. A row whose record could not be
    /// decoded fails with a single UNDECODABLE_ROW error.
    pub fn validate(&self, row: RawRow) -> Result<ValidatedRow, ValidationFailure> {
        if let Some(reason) = &row.decode_error {
            return Err(ValidationFailure {
                row_index: row.row_index,
                errors: vec![FieldError::for_row(ErrorCode::UndecodableRow, reason.clone())],
            });
        }

        let mut checker = Checker::new(&row);

        let sender_name = checker.required_text(Column::SenderName);
        let sender_contact = checker.required_contact(Column::SenderContact);
        let sender_address = checker.required_text(Column::SenderAddress);
        let sender_pincode = checker.optional_pincode(Column::SenderPincode);

        let receiver_name = checker.required_text(Column::ReceiverName);
        let receiver_contact = checker.required_contact(Column::ReceiverContact);
        let receiver_address = checker.required_text(Column::ReceiverAddress);
        let receiver_pincode = checker.optional_pincode(Column::ReceiverPincode);

        let item_count = checker.required_count(Column::ItemCount);
        let total_weight = checker.required_positive_decimal(Column::TotalWeight);

        let dimensions = Dimensions {
            length_cm: checker.optional_non_negative_decimal(Column::LengthCm),
            width_cm: checker.optional_non_negative_decimal(Column::WidthCm),
            height_cm: checker.optional_non_negative_decimal(Column::HeightCm),
        };
        let declared_value = checker.optional_non_negative_decimal(Column::DeclaredValue);
        let cod_amount = checker.optional_non_negative_decimal(Column::CodAmount);
        let client_email = checker.optional_email(Column::ClientEmail);

        let errors = checker.into_errors();

        match (
            sender_name,
            sender_contact,
            sender_address,
            receiver_name,
            receiver_contact,
            receiver_address,
            item_count,
            total_weight,
        ) {
            (
                Some(sender_name),
                Some(sender_contact),
                Some(sender_address),
                Some(receiver_name),
                Some(receiver_contact),
                Some(receiver_address),
                Some(item_count),
                Some(total_weight),
            ) if errors.is_empty() => {
                let text = |column| row.present(column).map(str::to_string);
                let details = OrderDetails {
                    client_reference: text(Column::ClientReference),
                    client_name: text(Column::ClientName),
                    client_email,
                    sender: Party {
                        name: sender_name,
                        contact: sender_contact,
                        address: sender_address,
                        city: text(Column::SenderCity),
                        state: text(Column::SenderState),
                        pincode: sender_pincode,
                    },
                    receiver: Party {
                        name: receiver_name,
                        contact: receiver_contact,
                        address: receiver_address,
                        city: text(Column::ReceiverCity),
                        state: text(Column::ReceiverState),
                        pincode: receiver_pincode,
                    },
                    item_description: text(Column::ItemDescription),
                    item_count,
                    total_weight,
                    dimensions,
                    declared_value,
                    service_type: text(Column::ServiceType),
                    carrier_name: text(Column::CarrierName),
                    carrier_code: text(Column::CarrierCode),
                    cod_amount,
                    special_instructions: text(Column::SpecialInstructions),
                };
                Ok(ValidatedRow::new(row, details))
            }
            _ => Err(ValidationFailure {
                row_index: row.row_index,
                errors,
            }),
        }
    }
}

/// Accumulates errors while reading typed values off a row
struct Checker<'a> {
    row: &'a RawRow,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn new(row: &'a RawRow) -> Self {
        Self {
            row,
            errors: Vec::new(),
        }
    }

    fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    fn reject(&mut self, code: ErrorCode, column: Column, message: String) {
        self.errors.push(FieldError::for_column(code, column, message));
    }

    fn required(&mut self, column: Column) -> Option<&'a str> {
        let value = self.row.present(column);
        if value.is_none() {
            self.reject(
                ErrorCode::RequiredFieldMissing,
                column,
                format!("{} is required", column),
            );
        }
        value
    }

    fn required_text(&mut self, column: Column) -> Option<String> {
        self.required(column).map(str::to_string)
    }

    fn required_contact(&mut self, column: Column) -> Option<String> {
        let raw = self.required(column)?;
        if is_valid_contact(raw) {
            Some(raw.to_string())
        } else {
            self.reject(
                ErrorCode::InvalidContact,
                column,
                format!(
                    "{} must contain {}-{} digits, got '{}'",
                    column, CONTACT_MIN_DIGITS, CONTACT_MAX_DIGITS, raw
                ),
            );
            None
        }
    }

    fn required_count(&mut self, column: Column) -> Option<u32> {
        let raw = self.required(column)?;
        match parse_whole_number(raw) {
            Some(count) if count > Decimal::ZERO => match u32::try_from(count.mantissa()) {
                Ok(count) => Some(count),
                Err(_) => {
                    self.reject(
                        ErrorCode::InvalidInteger,
                        column,
                        format!("{} is too large, got '{}'", column, raw),
                    );
                    None
                }
            },
            Some(_) => {
                self.reject(
                    ErrorCode::NonPositiveValue,
                    column,
                    format!("{} must be greater than zero, got '{}'", column, raw),
                );
                None
            }
            None => {
                self.reject(
                    ErrorCode::InvalidInteger,
                    column,
                    format!("{} must be a whole number, got '{}'", column, raw),
                );
                None
            }
        }
    }

    fn required_positive_decimal(&mut self, column: Column) -> Option<Decimal> {
        let raw = self.required(column)?;
        let value = self.decimal(column, raw)?;
        if value <= Decimal::ZERO {
            self.reject(
                ErrorCode::NonPositiveValue,
                column,
                format!("{} must be greater than zero, got '{}'", column, raw),
            );
            return None;
        }
        Some(value)
    }

    fn optional_non_negative_decimal(&mut self, column: Column) -> Option<Decimal> {
        let raw = self.row.present(column)?;
        let value = self.decimal(column, raw)?;
        if value.is_sign_negative() && !value.is_zero() {
            self.reject(
                ErrorCode::NegativeValue,
                column,
                format!("{} must not be negative, got '{}'", column, raw),
            );
            return None;
        }
        Some(value)
    }

    fn optional_pincode(&mut self, column: Column) -> Option<String> {
        let raw = self.row.present(column)?;
        if raw.len() == PINCODE_DIGITS && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(raw.to_string())
        } else {
            self.reject(
                ErrorCode::InvalidPincode,
                column,
                format!("{} must be {} digits, got '{}'", column, PINCODE_DIGITS, raw),
            );
            None
        }
    }

    fn optional_email(&mut self, column: Column) -> Option<String> {
        let raw = self.row.present(column)?;
        if is_valid_email(raw) {
            Some(raw.to_string())
        } else {
            self.reject(
                ErrorCode::InvalidEmail,
                column,
                format!("{} is not a valid email address, got '{}'", column, raw),
            );
            None
        }
    }

    fn decimal(&mut self, column: Column, raw: &str) -> Option<Decimal> {
        match Decimal::from_str(raw) {
            Ok(value) => Some(value),
            Err(_) => {
                self.reject(
                    ErrorCode::InvalidNumber,
                    column,
                    format!("{} must be a number, got '{}'", column, raw),
                );
                None
            }
        }
    }
}

/// Parse a whole number, accepting spreadsheet renderings such as `2.0`
///
/// Returns the normalized value (scale 0) so its mantissa is the integer.
fn parse_whole_number(raw: &str) -> Option<Decimal> {
    let value = Decimal::from_str(raw).ok()?;
    if value.fract().is_zero() {
        Some(value.trunc().normalize())
    } else {
        None
    }
}

fn is_valid_contact(raw: &str) -> bool {
    let stripped = raw.strip_prefix('+').unwrap_or(raw);
    let mut digits = 0;
    for c in stripped.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' => {}
            _ => return false,
        }
    }
    (CONTACT_MIN_DIGITS..=CONTACT_MAX_DIGITS).contains(&digits)
}

fn is_valid_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = raw.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

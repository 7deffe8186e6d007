//! Row-related types for the bulk order engine
//!
//! A row travels through two shapes:
//!
//! - [`RawRow`] - the 27 named columns exactly as decoded from the upload,
//!   every cell optional, plus its 1-based position in the file.
//! - [`ValidatedRow`] - the same row after [`RowValidator`](crate::core::RowValidator)
//!   has checked and typed it. A `ValidatedRow` can only be produced by the
//!   validator, so holding one means no field-level error exists.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a row in the uploaded file (1-based, header excluded)
pub type RowIndex = usize;

/// The 27 columns of the bulk order template, in template order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ClientReference,
    ClientName,
    ClientEmail,
    SenderName,
    SenderContact,
    SenderAddress,
    SenderCity,
    SenderState,
    SenderPincode,
    ReceiverName,
    ReceiverContact,
    ReceiverAddress,
    ReceiverCity,
    ReceiverState,
    ReceiverPincode,
    ItemDescription,
    ItemCount,
    TotalWeight,
    LengthCm,
    WidthCm,
    HeightCm,
    DeclaredValue,
    ServiceType,
    CarrierName,
    CarrierCode,
    CodAmount,
    SpecialInstructions,
}

impl Column {
    /// Every column in template order
    pub const ALL: [Column; 27] = [
        Column::ClientReference,
        Column::ClientName,
        Column::ClientEmail,
        Column::SenderName,
        Column::SenderContact,
        Column::SenderAddress,
        Column::SenderCity,
        Column::SenderState,
        Column::SenderPincode,
        Column::ReceiverName,
        Column::ReceiverContact,
        Column::ReceiverAddress,
        Column::ReceiverCity,
        Column::ReceiverState,
        Column::ReceiverPincode,
        Column::ItemDescription,
        Column::ItemCount,
        Column::TotalWeight,
        Column::LengthCm,
        Column::WidthCm,
        Column::HeightCm,
        Column::DeclaredValue,
        Column::ServiceType,
        Column::CarrierName,
        Column::CarrierCode,
        Column::CodAmount,
        Column::SpecialInstructions,
    ];

    /// Header name of the column as it appears in the upload
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::ClientReference => "clientReference",
            Column::ClientName => "clientName",
            Column::ClientEmail => "clientEmail",
            Column::SenderName => "senderName",
            Column::SenderContact => "senderContact",
            Column::SenderAddress => "senderAddress",
            Column::SenderCity => "senderCity",
            Column::SenderState => "senderState",
            Column::SenderPincode => "senderPincode",
            Column::ReceiverName => "receiverName",
            Column::ReceiverContact => "receiverContact",
            Column::ReceiverAddress => "receiverAddress",
            Column::ReceiverCity => "receiverCity",
            Column::ReceiverState => "receiverState",
            Column::ReceiverPincode => "receiverPincode",
            Column::ItemDescription => "itemDescription",
            Column::ItemCount => "itemCount",
            Column::TotalWeight => "totalWeight",
            Column::LengthCm => "lengthCm",
            Column::WidthCm => "widthCm",
            Column::HeightCm => "heightCm",
            Column::DeclaredValue => "declaredValue",
            Column::ServiceType => "serviceType",
            Column::CarrierName => "carrierName",
            Column::CarrierCode => "carrierCode",
            Column::CodAmount => "codAmount",
            Column::SpecialInstructions => "specialInstructions",
        }
    }

    /// Look up a column by its header name
    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL
            .iter()
            .copied()
            .find(|column| column.as_str() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the upload, as decoded
///
/// Cells are kept as text; typing happens in the validator. Columns missing
/// from the header and blank cells both decode to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRow {
    /// 1-based position of the row in the file
    #[serde(skip)]
    pub row_index: RowIndex,

    pub client_reference: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,

    pub sender_name: Option<String>,
    pub sender_contact: Option<String>,
    pub sender_address: Option<String>,
    pub sender_city: Option<String>,
    pub sender_state: Option<String>,
    pub sender_pincode: Option<String>,

    pub receiver_name: Option<String>,
    pub receiver_contact: Option<String>,
    pub receiver_address: Option<String>,
    pub receiver_city: Option<String>,
    pub receiver_state: Option<String>,
    pub receiver_pincode: Option<String>,

    pub item_description: Option<String>,
    pub item_count: Option<String>,
    pub total_weight: Option<String>,
    pub length_cm: Option<String>,
    pub width_cm: Option<String>,
    pub height_cm: Option<String>,
    pub declared_value: Option<String>,

    pub service_type: Option<String>,
    pub carrier_name: Option<String>,
    pub carrier_code: Option<String>,
    pub cod_amount: Option<String>,
    pub special_instructions: Option<String>,

    /// Set when the record at this position could not be decoded into cells
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl RawRow {
    /// Create an empty row at the given position
    pub fn new(row_index: RowIndex) -> Self {
        Self {
            row_index,
            ..Self::default()
        }
    }

    /// Placeholder for a record whose bytes could not be decoded
    ///
    /// The row keeps its position so it still gets an outcome.
    pub fn undecodable(row_index: RowIndex, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            decode_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Raw cell content of a column
    pub fn cell(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::ClientReference => &self.client_reference,
            Column::ClientName => &self.client_name,
            Column::ClientEmail => &self.client_email,
            Column::SenderName => &self.sender_name,
            Column::SenderContact => &self.sender_contact,
            Column::SenderAddress => &self.sender_address,
            Column::SenderCity => &self.sender_city,
            Column::SenderState => &self.sender_state,
            Column::SenderPincode => &self.sender_pincode,
            Column::ReceiverName => &self.receiver_name,
            Column::ReceiverContact => &self.receiver_contact,
            Column::ReceiverAddress => &self.receiver_address,
            Column::ReceiverCity => &self.receiver_city,
            Column::ReceiverState => &self.receiver_state,
            Column::ReceiverPincode => &self.receiver_pincode,
            Column::ItemDescription => &self.item_description,
            Column::ItemCount => &self.item_count,
            Column::TotalWeight => &self.total_weight,
            Column::LengthCm => &self.length_cm,
            Column::WidthCm => &self.width_cm,
            Column::HeightCm => &self.height_cm,
            Column::DeclaredValue => &self.declared_value,
            Column::ServiceType => &self.service_type,
            Column::CarrierName => &self.carrier_name,
            Column::CarrierCode => &self.carrier_code,
            Column::CodAmount => &self.cod_amount,
            Column::SpecialInstructions => &self.special_instructions,
        };
        value.as_deref()
    }

    /// Trimmed cell content, or `None` when the cell is absent or blank
    pub fn present(&self, column: Column) -> Option<&str> {
        self.cell(column)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Builder-style setter, mostly useful for tests and fixtures
    pub fn with(mut self, column: Column, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match column {
            Column::ClientReference => self.client_reference = value,
            Column::ClientName => self.client_name = value,
            Column::ClientEmail => self.client_email = value,
            Column::SenderName => self.sender_name = value,
            Column::SenderContact => self.sender_contact = value,
            Column::SenderAddress => self.sender_address = value,
            Column::SenderCity => self.sender_city = value,
            Column::SenderState => self.sender_state = value,
            Column::SenderPincode => self.sender_pincode = value,
            Column::ReceiverName => self.receiver_name = value,
            Column::ReceiverContact => self.receiver_contact = value,
            Column::ReceiverAddress => self.receiver_address = value,
            Column::ReceiverCity => self.receiver_city = value,
            Column::ReceiverState => self.receiver_state = value,
            Column::ReceiverPincode => self.receiver_pincode = value,
            Column::ItemDescription => self.item_description = value,
            Column::ItemCount => self.item_count = value,
            Column::TotalWeight => self.total_weight = value,
            Column::LengthCm => self.length_cm = value,
            Column::WidthCm => self.width_cm = value,
            Column::HeightCm => self.height_cm = value,
            Column::DeclaredValue => self.declared_value = value,
            Column::ServiceType => self.service_type = value,
            Column::CarrierName => self.carrier_name = value,
            Column::CarrierCode => self.carrier_code = value,
            Column::CodAmount => self.cod_amount = value,
            Column::SpecialInstructions => self.special_instructions = value,
        }
        self
    }
}

/// Machine-readable classification of a row error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A mandatory cell is absent or blank
    RequiredFieldMissing,
    /// Cell must hold a whole number
    InvalidInteger,
    /// Cell must hold a decimal number
    InvalidNumber,
    /// Number must be strictly greater than zero
    NonPositiveValue,
    /// Number must not be negative
    NegativeValue,
    /// Phone number is malformed
    InvalidContact,
    /// Postal code is malformed
    InvalidPincode,
    /// Email address is malformed
    InvalidEmail,
    /// Persistence failed while creating the order
    TechnicalError,
    /// Row processing failed unexpectedly
    InternalError,
    /// Row was never started because the batch was cancelled
    BatchCancelled,
    /// The record's bytes could not be decoded into cells
    UndecodableRow,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            ErrorCode::InvalidInteger => "INVALID_INTEGER",
            ErrorCode::InvalidNumber => "INVALID_NUMBER",
            ErrorCode::NonPositiveValue => "NON_POSITIVE_VALUE",
            ErrorCode::NegativeValue => "NEGATIVE_VALUE",
            ErrorCode::InvalidContact => "INVALID_CONTACT",
            ErrorCode::InvalidPincode => "INVALID_PINCODE",
            ErrorCode::InvalidEmail => "INVALID_EMAIL",
            ErrorCode::TechnicalError => "TECHNICAL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::BatchCancelled => "BATCH_CANCELLED",
            ErrorCode::UndecodableRow => "UNDECODABLE_ROW",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name used for errors that concern the whole row
pub const ROW_FIELD: &str = "row";

/// A single problem found on a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: ErrorCode,
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Error tied to one column
    pub fn for_column(code: ErrorCode, column: Column, message: impl Into<String>) -> Self {
        Self::new(code, column.as_str(), message)
    }

    /// Error that concerns the row as a whole
    pub fn for_row(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, ROW_FIELD, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.field, self.message)
    }
}

/// Contact and address of one side of a shipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub name: String,
    pub contact: String,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// Package dimensions in centimetres
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
}

/// Typed order content extracted from a validated row
///
/// This is what gets persisted with a created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub client_reference: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub sender: Party,
    pub receiver: Party,
    pub item_description: Option<String>,
    pub item_count: u32,
    pub total_weight: Decimal,
    pub dimensions: Dimensions,
    pub declared_value: Option<Decimal>,
    pub service_type: Option<String>,
    pub carrier_name: Option<String>,
    pub carrier_code: Option<String>,
    pub cod_amount: Option<Decimal>,
    pub special_instructions: Option<String>,
}

/// A row that passed validation
///
/// Only [`RowValidator`](crate::core::RowValidator) constructs this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    raw: RawRow,
    details: OrderDetails,
}

impl ValidatedRow {
    pub(crate) fn new(raw: RawRow, details: OrderDetails) -> Self {
        Self { raw, details }
    }

    pub fn row_index(&self) -> RowIndex {
        self.raw.row_index
    }

    /// The row as it was uploaded
    pub fn raw(&self) -> &RawRow {
        &self.raw
    }

    /// Typed, normalized content
    pub fn details(&self) -> &OrderDetails {
        &self.details
    }

    pub fn into_details(self) -> OrderDetails {
        self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_all_columns_are_distinct() {
        let mut headers: Vec<&str> = Column::ALL.iter().map(Column::as_str).collect();
        headers.sort_unstable();
        headers.dedup();
        assert_eq!(headers.len(), 27);
    }

    #[rstest]
    #[case("clientReference", Some(Column::ClientReference))]
    #[case("receiverPincode", Some(Column::ReceiverPincode))]
    #[case("specialInstructions", Some(Column::SpecialInstructions))]
    #[case("ReceiverName", None)]
    #[case("unknown", None)]
    fn test_column_from_header(#[case] header: &str, #[case] expected: Option<Column>) {
        assert_eq!(Column::from_header(header), expected);
    }

    #[test]
    fn test_every_column_round_trips_through_setter() {
        for column in Column::ALL {
            let row = RawRow::new(1).with(column, "x");
            assert_eq!(row.cell(column), Some("x"), "column {}", column);
        }
    }

    #[rstest]
    #[case::absent(None, None)]
    #[case::blank(Some("   "), None)]
    #[case::padded(Some("  REF-1 "), Some("REF-1"))]
    fn test_present_trims_and_filters_blank(
        #[case] cell: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let mut row = RawRow::new(1);
        row.client_reference = cell.map(str::to_string);
        assert_eq!(row.present(Column::ClientReference), expected);
    }

    #[test]
    fn test_error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::RequiredFieldMissing).unwrap();
        assert_eq!(json, "\"REQUIRED_FIELD_MISSING\"");
        assert_eq!(ErrorCode::BatchCancelled.to_string(), "BATCH_CANCELLED");
    }

    #[test]
    fn test_field_error_display() {
        let error = FieldError::for_column(
            ErrorCode::RequiredFieldMissing,
            Column::ReceiverName,
            "receiverName is required",
        );
        assert_eq!(
            error.to_string(),
            "[REQUIRED_FIELD_MISSING] receiverName: receiverName is required"
        );
    }
}

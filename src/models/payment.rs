//! Реквизиты оплаты с шага оплаты мастера.
//!
//! Списания нет, реквизиты только проверяются и никуда не сохраняются.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Способ оплаты с реквизитами, JSON вида `{"method": "upi", "upi_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentDetails {
    Upi(UpiDetails),
    Credit(CardDetails),
    Debit(CardDetails),
}

impl PaymentDetails {
    pub fn method(&self) -> &'static str {
        match self {
            PaymentDetails::Upi(_) => "upi",
            PaymentDetails::Credit(_) => "credit",
            PaymentDetails::Debit(_) => "debit",
        }
    }
}

impl Validate for PaymentDetails {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            PaymentDetails::Upi(upi) => upi.validate(),
            PaymentDetails::Credit(card) | PaymentDetails::Debit(card) => card.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpiDetails {
    #[validate(contains(pattern = "@", message = "UPI id must contain '@'"))]
    pub upi_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CardDetails {
    /// 16 цифр, пробелы между группами допускаются.
    #[validate(custom(function = "validate_card_number"))]
    pub card_number: String,
    /// MM/YY
    #[validate(custom(function = "validate_expiry"))]
    pub expiry: String,
    #[validate(custom(function = "validate_cvv"))]
    pub cvv: String,
    #[validate(length(min = 3, message = "cardholder name is too short"))]
    pub card_name: String,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_card_number(value: &str) -> Result<(), ValidationError> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() == 16 && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("card_number", "card number must have 16 digits"))
    }
}

fn validate_expiry(value: &str) -> Result<(), ValidationError> {
    let err = || invalid("expiry", "expiry must be MM/YY");
    let (month, year) = value.split_once('/').ok_or_else(err)?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(month) || !two_digits(year) {
        return Err(err());
    }
    match month.parse::<u8>() {
        Ok(1..=12) => Ok(()),
        _ => Err(err()),
    }
}

fn validate_cvv(value: &str) -> Result<(), ValidationError> {
    if value.len() >= 3 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("cvv", "CVV must have at least 3 digits"))
    }
}

// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

// Valores monetários precisam ser estritamente positivos
pub fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("positive_amount")
            .with_message("O valor deve ser maior que zero.".into()));
    }
    Ok(())
}

pub fn required_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

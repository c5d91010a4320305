// Validation utilities module
// Custom field validators for discount rule requests

use rust_decimal::Decimal;
use validator::ValidationError;

/// Decimal places kept by the NUMERIC(12,4) rule columns
pub const STORED_DECIMAL_PLACES: u32 = 4;

/// Largest amount the NUMERIC(12,4) rule columns hold
pub fn max_stored_amount() -> Decimal {
    Decimal::new(999_999_999_999, STORED_DECIMAL_PLACES)
}

/// Rejects values the rule columns would round on insert
fn validate_stored_scale(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > STORED_DECIMAL_PLACES {
        Err(ValidationError::new("too_many_decimal_places"))
    } else {
        Ok(())
    }
}

/// Validates that a monetary amount is not negative and fits a rule column
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_non_negative"));
    }
    if *amount > max_stored_amount() {
        return Err(ValidationError::new("amount_out_of_range"));
    }
    validate_stored_scale(amount)
}

/// Validates that a percentage lies within 0 and 100 inclusive
pub fn validate_percentage(percent: &Decimal) -> Result<(), ValidationError> {
    if *percent < Decimal::ZERO || *percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_out_of_range"));
    }
    validate_stored_scale(percent)
}

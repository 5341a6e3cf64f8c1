//! # Validation Module
//!
//! Validation of the manual "create product" form.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form widgets (presentation layer)                             │
//! │  ├── Numeric keyboards for nutrient fields                              │
//! │  └── Read-only barcode when it came from the camera                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── ProductForm (strings) → NewProduct (typed)                         │
//! │  └── Rejection never touches the acquisition session                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend mutation (Decimal arguments, required barcode)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nutrition_core::types::ProductForm;
//! use nutrition_core::validation::validate_product_form;
//!
//! let form = ProductForm {
//!     barcode: "9999999999999".into(),
//!     brand: "Acme".into(),
//!     name: "Bar".into(),
//!     energy: "230".into(),
//!     ..Default::default()
//! };
//!
//! let product = validate_product_form(&form).unwrap();
//! assert_eq!(product.energy.unwrap().to_string(), "230.00");
//! ```

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::types::{NewProduct, ProductForm};
use crate::{MAX_BARCODE_LEN, MAX_TEXT_FIELD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a barcode payload.
///
/// ## Rules
/// - Must not be empty
/// - At most 48 characters
/// - ASCII letters and digits only
///
/// ## Example
/// ```rust
/// use nutrition_core::validation::validate_barcode;
///
/// assert!(validate_barcode("0123456789012").is_ok());
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("0123 4567").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text field and returns the trimmed value.
fn validate_text(field: &str, value: &str, required: bool) -> ValidationResult<Option<String>> {
    let value = value.trim();

    if value.is_empty() {
        if required {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }
        return Ok(None);
    }

    if value.chars().count() > MAX_TEXT_FIELD_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_FIELD_LEN,
        });
    }

    Ok(Some(value.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses an optional amount field. Blank means "not on the label".
pub fn validate_optional_quantity(field: &str, value: &str) -> ValidationResult<Option<Quantity>> {
    if value.trim().is_empty() {
        return Ok(None);
    }

    Quantity::parse_field(field, value).map(Some)
}

/// Parses the serving count, which must be positive when present.
fn validate_servings(value: &str) -> ValidationResult<Option<Quantity>> {
    let servings = validate_optional_quantity("numServings", value)?;

    if matches!(servings, Some(q) if q.is_zero()) {
        return Err(ValidationError::MustBePositive {
            field: "numServings".to_string(),
        });
    }

    Ok(servings)
}

// =============================================================================
// Form Validator
// =============================================================================

/// Validates the whole manual form, stopping at the first problem.
pub fn validate_product_form(form: &ProductForm) -> ValidationResult<NewProduct> {
    validate_barcode(&form.barcode)?;

    let brand = validate_text("brand", &form.brand, false)?;
    let name = validate_text("name", &form.name, true)?.unwrap_or_default();

    Ok(NewProduct {
        barcode: form.barcode.trim().to_string(),
        brand,
        name,
        weight: validate_optional_quantity("weight", &form.weight)?,
        num_servings: validate_servings(&form.num_servings)?,
        energy: validate_optional_quantity("energy", &form.energy)?,
        carbs: validate_optional_quantity("carbs", &form.carbs)?,
        fat: validate_optional_quantity("fat", &form.fat)?,
        protein: validate_optional_quantity("protein", &form.protein)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn acme_bar() -> ProductForm {
        ProductForm {
            barcode: "9999999999999".into(),
            brand: "Acme".into(),
            name: "Bar".into(),
            weight: "50".into(),
            num_servings: "2".into(),
            energy: "230".into(),
            carbs: "25.5".into(),
            fat: "11".into(),
            protein: "3.2".into(),
        }
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("0123456789012").is_ok());
        assert!(validate_barcode("ABC123").is_ok());

        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("   ").is_err());
        assert!(validate_barcode("has space").is_err());
        assert!(validate_barcode("12-34").is_err());
        assert!(validate_barcode(&"1".repeat(49)).is_err());
    }

    #[test]
    fn test_valid_form() {
        let product = validate_product_form(&acme_bar()).unwrap();
        assert_eq!(product.barcode, "9999999999999");
        assert_eq!(product.brand.as_deref(), Some("Acme"));
        assert_eq!(product.name, "Bar");
        assert_eq!(product.carbs, Some(Quantity::from_hundredths(2550)));
        assert_eq!(product.num_servings, Some(Quantity::from_units(2)));
    }

    #[test]
    fn test_blank_optional_fields() {
        let form = ProductForm {
            barcode: "9999999999999".into(),
            name: "Bar".into(),
            ..Default::default()
        };
        let product = validate_product_form(&form).unwrap();
        assert_eq!(product.brand, None);
        assert_eq!(product.energy, None);
        assert_eq!(product.num_servings, None);
    }

    #[test]
    fn test_rejects_non_numeric_nutrients() {
        let mut form = acme_bar();
        form.fat = "a little".into();
        assert_eq!(
            validate_product_form(&form).unwrap_err(),
            ValidationError::InvalidFormat {
                field: "fat".into(),
                reason: "must be a number".into(),
            }
        );
    }

    #[test]
    fn test_rejects_zero_servings() {
        let mut form = acme_bar();
        form.num_servings = "0".into();
        assert_eq!(
            validate_product_form(&form).unwrap_err(),
            ValidationError::MustBePositive {
                field: "numServings".into()
            }
        );
    }

    #[test]
    fn test_requires_name() {
        let mut form = acme_bar();
        form.name = "  ".into();
        assert!(matches!(
            validate_product_form(&form),
            Err(ValidationError::Required { field }) if field == "name"
        ));
    }
}

//! # GraphQL Envelopes
//!
//! Request documents and response envelopes for the two product operations.
//! Transport (HTTP client, auth, endpoint) is not this crate's business; a
//! service implementation sends [`GraphQlRequest`] however it likes and hands
//! the response body back to [`lookup_result_from_json`] or
//! [`create_result_from_json`].
//!
//! ## Response Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Response body                                 →  Service result        │
//! │  ─────────────────────────────────────────────    ───────────────────   │
//! │  { "errors": [..non-empty..] }                 →  Err(Server(errors))   │
//! │  { "data": { "getFoodProductByBarcode": {..} } →  Ok(Some(product))     │
//! │  { "data": { "getFoodProductByBarcode": null } →  Ok(None)  not found   │
//! │  { "data": null }                              →  Err(Transport)        │
//! │  not JSON / wrong shape                        →  Err(Transport)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::types::{CreateResult, LookupResult, NewProduct, ProductRecord, ServerError};

// =============================================================================
// Documents
// =============================================================================

/// Fields requested for every product.
const PRODUCT_FIELDS: &str = "barcode brand name weight numServings energy carbsG fatG proteinG";

/// Query document for `lookupByCode`.
pub fn lookup_document() -> String {
    format!(
        "query GetFoodProductByBarcode($barcode: String!) {{ \
           getFoodProductByBarcode(barcode: $barcode) {{ {PRODUCT_FIELDS} }} \
         }}"
    )
}

/// Mutation document for `createProduct`.
pub fn create_document() -> String {
    format!(
        "mutation CreateFoodProduct(\
           $barcode: String!, $brand: String, $name: String, $weight: Decimal, \
           $numServings: Decimal, $energy: Decimal, $carbsG: Decimal, $fatG: Decimal, \
           $proteinG: Decimal\
         ) {{ \
           createFoodProduct(\
             barcode: $barcode, brand: $brand, name: $name, weight: $weight, \
             numServings: $numServings, energy: $energy, carbsG: $carbsG, fatG: $fatG, \
             proteinG: $proteinG\
           ) {{ foodProduct {{ {PRODUCT_FIELDS} }} }} \
         }}"
    )
}

// =============================================================================
// Request
// =============================================================================

/// A GraphQL request body: `{ "query": ..., "variables": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Value,
}

impl GraphQlRequest {
    /// Request for `getFoodProductByBarcode`.
    pub fn lookup(code: &str) -> Self {
        GraphQlRequest {
            query: lookup_document(),
            variables: json!({ "barcode": code }),
        }
    }

    /// Request for `createFoodProduct`. Absent amounts are sent as null.
    pub fn create(product: &NewProduct) -> Self {
        GraphQlRequest {
            query: create_document(),
            variables: json!({
                "barcode": product.barcode,
                "brand": product.brand,
                "name": product.name,
                "weight": product.weight,
                "numServings": product.num_servings,
                "energy": product.energy,
                "carbsG": product.carbs,
                "fatG": product.fat,
                "proteinG": product.protein,
            }),
        }
    }
}

// =============================================================================
// Response Envelopes
// =============================================================================

/// Standard GraphQL response envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,

    pub errors: Option<Vec<ServerError>>,
}

impl<T> GraphQlResponse<T> {
    /// Server errors win over data, even when both are present.
    pub fn into_result(self) -> Result<Option<T>, ServiceError> {
        match self.errors {
            Some(errors) if !errors.is_empty() => Err(ServiceError::Server(errors)),
            _ => Ok(self.data),
        }
    }
}

/// `data` of the lookup query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFoodProductByBarcodeData {
    #[serde(default)]
    pub get_food_product_by_barcode: Option<ProductRecord>,
}

/// `data` of the create mutation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFoodProductData {
    #[serde(default)]
    pub create_food_product: Option<CreateFoodProductPayload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFoodProductPayload {
    #[serde(default)]
    pub food_product: Option<ProductRecord>,
}

// =============================================================================
// Decoding
// =============================================================================

fn decode<T>(body: &str) -> Result<GraphQlResponse<T>, ServiceError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(body)
        .map_err(|e| ServiceError::transport(format!("malformed response: {}", e)))
}

/// Maps a lookup response body to a [`LookupResult`].
pub fn lookup_result_from_json(body: &str) -> LookupResult {
    let data = decode::<GetFoodProductByBarcodeData>(body)?
        .into_result()?
        .ok_or_else(|| ServiceError::transport("response carried neither data nor errors"))?;

    Ok(data.get_food_product_by_barcode)
}

/// Maps a create response body to a [`CreateResult`].
pub fn create_result_from_json(body: &str) -> CreateResult {
    decode::<CreateFoodProductData>(body)?
        .into_result()?
        .and_then(|data| data.create_food_product)
        .and_then(|payload| payload.food_product)
        .ok_or_else(|| ServiceError::transport("createFoodProduct returned no product"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;
    use crate::types::PathSegment;

    #[test]
    fn test_lookup_found() {
        let body = r#"{
            "data": {
                "getFoodProductByBarcode": {
                    "id": "1",
                    "brand": "Ocado",
                    "name": "Chicken Breast",
                    "barcode": "012308980493",
                    "energy": "106.0",
                    "weight": "320.0",
                    "weightUnit": "G",
                    "numServings": "2.0",
                    "proteinG": "24.0",
                    "fatG": "1.1",
                    "carbsG": "0.0"
                }
            }
        }"#;

        let product = lookup_result_from_json(body).unwrap().unwrap();
        assert_eq!(product.barcode, "012308980493");
        assert_eq!(product.brand.as_deref(), Some("Ocado"));
        assert_eq!(product.fat, Some(Quantity::from_hundredths(110)));
        assert_eq!(product.energy_per_serving(), Some(Quantity::from_units(53)));
    }

    #[test]
    fn test_lookup_null_is_not_found() {
        let body = r#"{ "data": { "getFoodProductByBarcode": null } }"#;
        assert_eq!(lookup_result_from_json(body), Ok(None));
    }

    #[test]
    fn test_errors_map_to_server() {
        let body = r#"{
            "data": { "getFoodProductByBarcode": null },
            "errors": [
                { "message": "FoodProduct matching query does not exist.",
                  "locations": [{ "line": 1, "column": 3 }],
                  "path": ["getFoodProductByBarcode"] }
            ]
        }"#;

        match lookup_result_from_json(body) {
            Err(ServiceError::Server(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].message, "FoodProduct matching query does not exist.");
                assert_eq!(
                    errors[0].path,
                    vec![PathSegment::Field("getFoodProductByBarcode".into())]
                );
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_errors_list_is_not_an_error() {
        let body = r#"{ "data": { "getFoodProductByBarcode": null }, "errors": [] }"#;
        assert_eq!(lookup_result_from_json(body), Ok(None));
    }

    #[test]
    fn test_envelope_fields_may_be_absent() {
        let only_errors = r#"{ "errors": [{ "message": "unauthorized" }] }"#;
        match lookup_result_from_json(only_errors) {
            Err(ServiceError::Server(errors)) => assert_eq!(errors[0].message, "unauthorized"),
            other => panic!("expected server error, got {:?}", other),
        }

        let response: GraphQlResponse<GetFoodProductByBarcodeData> =
            serde_json::from_str(r#"{ "data": { "getFoodProductByBarcode": null } }"#).unwrap();
        assert_eq!(response.errors, None);
        assert_eq!(response.into_result(), Ok(Some(GetFoodProductByBarcodeData {
            get_food_product_by_barcode: None,
        })));
    }

    #[test]
    fn test_malformed_bodies_are_transport_failures() {
        assert!(matches!(
            lookup_result_from_json("<html>502</html>"),
            Err(ServiceError::Transport(_))
        ));
        assert!(matches!(
            lookup_result_from_json(r#"{ "data": null }"#),
            Err(ServiceError::Transport(_))
        ));
        assert!(matches!(
            create_result_from_json(r#"{ "data": { "createFoodProduct": { "foodProduct": null } } }"#),
            Err(ServiceError::Transport(_))
        ));
    }

    #[test]
    fn test_create_success() {
        let body = r#"{
            "data": { "createFoodProduct": { "foodProduct": {
                "barcode": "9999999999999", "brand": "Acme", "name": "Bar"
            } } }
        }"#;

        let product = create_result_from_json(body).unwrap();
        assert_eq!(product.display_name(), "Acme Bar");
    }

    #[test]
    fn test_create_request_variables() {
        let product = NewProduct {
            barcode: "9999999999999".into(),
            brand: None,
            name: "Bar".into(),
            weight: None,
            num_servings: Some(Quantity::from_units(2)),
            energy: Some(Quantity::from_hundredths(23050)),
            carbs: None,
            fat: None,
            protein: None,
        };

        let request = GraphQlRequest::create(&product);
        assert!(request.query.contains("createFoodProduct("));
        assert_eq!(request.variables["barcode"], "9999999999999");
        assert_eq!(request.variables["energy"], "230.50");
        assert_eq!(request.variables["numServings"], "2.00");
        assert!(request.variables["brand"].is_null());

        let lookup = GraphQlRequest::lookup("0123456789012");
        assert!(lookup.query.contains("getFoodProductByBarcode(barcode: $barcode)"));
        assert_eq!(lookup.variables["barcode"], "0123456789012");
    }
}

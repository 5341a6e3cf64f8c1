//! # Product Service
//!
//! The lookup/create collaborator and its GraphQL adapter.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  AcquisitionAgent                                                       │
//! │       │  call_with_timeout(..)                                          │
//! │       ▼                                                                 │
//! │  ProductService  (trait)                                                │
//! │       │                                                                 │
//! │       ├── GraphQlProductService<T>                                      │
//! │       │        builds GraphQlRequest, decodes GraphQlResponse           │
//! │       │        │                                                        │
//! │       │        ▼                                                        │
//! │       │   GraphQlTransport (trait) - HTTP client, auth, endpoint        │
//! │       │                                                                 │
//! │       └── any other implementation (tests, fixtures)                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use nutrition_core::graphql::{create_result_from_json, lookup_result_from_json, GraphQlRequest};
use nutrition_core::{CreateResult, LookupResult, NewProduct, ServiceError};
use std::future::Future;
use std::time::Duration;

// =============================================================================
// Service Trait
// =============================================================================

/// External product lookup and creation.
///
/// `Ok(None)` from a lookup means "not found" and is not an error.
#[async_trait]
pub trait ProductService: Send + Sync + 'static {
    async fn lookup_by_code(&self, code: &str) -> LookupResult;

    async fn create_product(&self, product: &NewProduct) -> CreateResult;
}

/// Runs a service call with an upper bound.
///
/// An elapsed call becomes [`ServiceError::Transport`]; the call itself is
/// dropped.
pub async fn call_with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Transport(format!(
            "timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

// =============================================================================
// GraphQL Adapter
// =============================================================================

/// Sends a GraphQL request and returns the raw response body.
///
/// Only network-level failures belong in the `Err` branch; a body carrying
/// GraphQL `errors` is a successful exchange.
#[async_trait]
pub trait GraphQlTransport: Send + Sync + 'static {
    async fn execute(&self, request: &GraphQlRequest) -> Result<String, ServiceError>;
}

/// [`ProductService`] over the `getFoodProductByBarcode` query and the
/// `createFoodProduct` mutation.
pub struct GraphQlProductService<T> {
    transport: T,
}

impl<T: GraphQlTransport> GraphQlProductService<T> {
    pub fn new(transport: T) -> Self {
        GraphQlProductService { transport }
    }
}

#[async_trait]
impl<T: GraphQlTransport> ProductService for GraphQlProductService<T> {
    async fn lookup_by_code(&self, code: &str) -> LookupResult {
        let body = self.transport.execute(&GraphQlRequest::lookup(code)).await?;
        lookup_result_from_json(&body)
    }

    async fn create_product(&self, product: &NewProduct) -> CreateResult {
        let body = self
            .transport
            .execute(&GraphQlRequest::create(product))
            .await?;
        create_result_from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with a fixed body and remembers the variables it was sent.
    struct CannedTransport {
        body: Result<String, ServiceError>,
        seen: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl GraphQlTransport for CannedTransport {
        async fn execute(&self, request: &GraphQlRequest) -> Result<String, ServiceError> {
            self.seen
                .lock()
                .unwrap()
                .push(request.variables.clone());
            self.body.clone()
        }
    }

    fn service(body: Result<&str, ServiceError>) -> GraphQlProductService<CannedTransport> {
        GraphQlProductService::new(CannedTransport {
            body: body.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_lookup_decodes_envelope() {
        let svc = service(Ok(
            r#"{"data":{"getFoodProductByBarcode":{"barcode":"0123456789012","name":"Oats"}}}"#,
        ));

        let product = svc.lookup_by_code("0123456789012").await.unwrap().unwrap();
        assert_eq!(product.name.as_deref(), Some("Oats"));
        assert_eq!(
            svc.transport.seen.lock().unwrap()[0]["barcode"],
            "0123456789012"
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let svc = service(Ok(r#"{"data":{"getFoodProductByBarcode":null}}"#));
        assert_eq!(svc.lookup_by_code("9999999999999").await, Ok(None));
    }

    #[tokio::test]
    async fn test_transport_failure_passes_through() {
        let svc = service(Err(ServiceError::transport("connection refused")));
        assert_eq!(
            svc.lookup_by_code("0123456789012").await,
            Err(ServiceError::transport("connection refused"))
        );
    }

    #[tokio::test]
    async fn test_create_server_errors() {
        let svc = service(Ok(
            r#"{"data":null,"errors":[{"message":"barcode already exists"}]}"#,
        ));
        let product = NewProduct {
            barcode: "9999999999999".into(),
            brand: Some("Acme".into()),
            name: "Bar".into(),
            weight: None,
            num_servings: None,
            energy: None,
            carbs: None,
            fat: None,
            protein: None,
        };

        match svc.create_product(&product).await {
            Err(ServiceError::Server(errors)) => {
                assert_eq!(errors[0].message, "barcode already exists")
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_with_timeout_elapses() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ServiceError>(())
        };

        let result = call_with_timeout(Duration::from_secs(2), slow).await;
        assert_eq!(result, Err(ServiceError::Transport("timed out after 2000ms".into())));
    }

    #[tokio::test]
    async fn test_call_with_timeout_passes_result() {
        let fast = async { Ok::<_, ServiceError>(7) };
        assert_eq!(call_with_timeout(Duration::from_secs(1), fast).await, Ok(7));
    }
}

//! # Scan Simulator
//!
//! Replays a scripted camera feed through the real pipeline and agent, with
//! a fixture detector and a fixture GraphQL backend, and prints every status
//! transition. Development aid for checking the workflow end to end.
//!
//! ## Usage
//! ```bash
//! # Default script: one known product, one unknown product
//! cargo run -p nutrition-scan --bin scan-sim
//!
//! # Use a specific config file
//! cargo run -p nutrition-scan --bin scan-sim -- --config ./scan.toml
//!
//! # More logging
//! RUST_LOG=nutrition_scan=trace cargo run -p nutrition-scan --bin scan-sim
//! ```
//!
//! ## Fixture Frames
//! A frame's bytes are its barcode payload as UTF-8. An empty frame has no
//! code; a frame containing `!` makes the detector fail.

use async_trait::async_trait;
use nutrition_core::graphql::GraphQlRequest;
use nutrition_core::{
    AcquisitionState, AcquisitionStatus, DetectedCode, DetectionResult, Frame, ProductForm,
    ServiceError, Symbology,
};
use nutrition_scan::{
    AcquisitionAgentBuilder, AcquisitionHandle, BarcodeDetector, DetectorError, FramePipeline,
    GraphQlProductService, GraphQlTransport, PantryNotifier, ScanConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Barcode already registered in the fixture backend.
const KNOWN_CODE: &str = "0123456789012";

/// Barcode the fixture backend has never seen.
const UNKNOWN_CODE: &str = "9999999999999";

/// How long to wait for any single transition before giving up.
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Fixtures
// =============================================================================

/// Detector that reads the barcode straight out of the frame bytes.
struct FixtureDetector;

#[async_trait]
impl BarcodeDetector for FixtureDetector {
    async fn detect(&self, frame: &Frame) -> Result<DetectionResult, DetectorError> {
        // Pretend decoding is slower than the camera.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let payload = String::from_utf8_lossy(&frame.data);
        if payload.contains('!') {
            return Err(DetectorError::new("motion blur"));
        }

        let codes = if payload.is_empty() {
            Vec::new()
        } else {
            vec![DetectedCode::new(payload.to_string(), Symbology::Ean13)]
        };
        Ok(DetectionResult::new(codes, frame.width, frame.height))
    }
}

/// In-memory GraphQL backend answering with canned JSON bodies.
struct FixtureBackend {
    products: Mutex<HashMap<String, Value>>,
}

impl FixtureBackend {
    fn new() -> Self {
        let mut products = HashMap::new();
        products.insert(
            KNOWN_CODE.to_string(),
            json!({
                "barcode": KNOWN_CODE,
                "brand": "Ocado",
                "name": "Rolled Oats",
                "weight": "1000.0",
                "numServings": "25.0",
                "energy": "3740.0",
                "carbsG": "600.0",
                "fatG": "80.0",
                "proteinG": "110.0"
            }),
        );
        FixtureBackend {
            products: Mutex::new(products),
        }
    }
}

#[async_trait]
impl GraphQlTransport for FixtureBackend {
    async fn execute(&self, request: &GraphQlRequest) -> Result<String, ServiceError> {
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut products = self
            .products
            .lock()
            .map_err(|_| ServiceError::transport("fixture backend poisoned"))?;
        let barcode = request.variables["barcode"].as_str().unwrap_or_default();

        let body = if request.query.contains("createFoodProduct") {
            let product = request.variables.clone();
            products.insert(barcode.to_string(), product.clone());
            json!({ "data": { "createFoodProduct": { "foodProduct": product } } })
        } else {
            json!({ "data": { "getFoodProductByBarcode": products.get(barcode) } })
        };

        Ok(body.to_string())
    }
}

/// Pantry that prints what it receives.
struct PrintingPantry;

#[async_trait]
impl PantryNotifier for PrintingPantry {
    async fn add_to_pantry(&self, product: nutrition_core::ProductRecord) {
        println!("  🥫 pantry <- {}", product.display_name());
    }
}

// =============================================================================
// Script Helpers
// =============================================================================

fn frame(payload: &str) -> Frame {
    Frame::new(payload.as_bytes().to_vec(), 1280, 720)
}

/// Feeds `noise` empty frames and then `repeat` frames carrying `code`.
async fn feed(pipeline: &FramePipeline, code: &str, noise: usize, repeat: usize) {
    for i in 0..noise {
        let payload = if i % 7 == 3 { "!" } else { "" };
        pipeline.submit_frame(frame(payload));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    for _ in 0..repeat {
        pipeline.submit_frame(frame(code));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn expect<F>(
    handle: &AcquisitionHandle,
    label: &str,
    predicate: F,
) -> Result<AcquisitionStatus, Box<dyn std::error::Error>>
where
    F: FnMut(&AcquisitionStatus) -> bool,
{
    let status = tokio::time::timeout(STEP_TIMEOUT, handle.wait_for(predicate))
        .await
        .map_err(|_| format!("timed out waiting for {}", label))??;
    Ok(status)
}

fn print_status(status: &AcquisitionStatus) {
    let product = status
        .product
        .as_ref()
        .map(|p| p.display_name())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  [{}] {:<22} code={:<15} product={}",
        &status.session_id.to_string()[..8],
        status.state.to_string(),
        status.active_code.as_deref().unwrap_or("-"),
        product
    );
}

/// Initializes tracing with `RUST_LOG`, falling back to debug for this crate.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nutrition_scan=debug,info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Nutrition Scan Simulator");
                println!();
                println!("Usage: scan-sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  scan.toml to load (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let config = ScanConfig::load_or_default(config_path);

    println!("📷 Nutrition Scan Simulator");
    println!("===========================");
    println!("Call timeout:  {}s", config.agent.call_timeout_secs);
    println!("Symbologies:   {:?}", config.symbologies());
    println!();

    let service = GraphQlProductService::new(FixtureBackend::new());
    let handle = AcquisitionAgentBuilder::new()
        .with_config(config.clone())
        .with_service(Arc::new(service))
        .with_pantry(Arc::new(PrintingPantry))
        .build()?
        .start();

    // Print every published status
    let mut status_rx = handle.subscribe();
    print_status(&status_rx.borrow());
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            print_status(&status);
        }
    });

    let pipeline = FramePipeline::spawn(FixtureDetector, handle.clone(), &config.pipeline)?;

    // -------------------------------------------------------------------------
    // Known product: scan, confirm, fetched, pantry
    // -------------------------------------------------------------------------
    println!("▶ Scanning a known product");
    feed(&pipeline, KNOWN_CODE, 12, 20).await;
    expect(&handle, "barcode", |s| s.state == AcquisitionState::BarcodeDetected).await?;

    // Double tap: the second confirm is ignored
    handle.confirm().await?;
    handle.confirm().await?;
    expect(&handle, "lookup", |s| s.state == AcquisitionState::Fetched).await?;
    handle.add_to_pantry().await?;
    expect(&handle, "pantry", |s| s.state == AcquisitionState::AddedToPantry).await?;

    // -------------------------------------------------------------------------
    // Unknown product: scan, not found, manual create, pantry
    // -------------------------------------------------------------------------
    println!();
    println!("▶ Scanning an unknown product");
    handle.reset().await?;
    feed(&pipeline, UNKNOWN_CODE, 6, 10).await;
    expect(&handle, "barcode", |s| s.state == AcquisitionState::BarcodeDetected).await?;
    handle.confirm().await?;
    expect(&handle, "lookup", |s| s.state == AcquisitionState::NotFound).await?;

    let form = ProductForm {
        barcode: UNKNOWN_CODE.into(),
        brand: "Acme".into(),
        name: "Protein Bar".into(),
        weight: "60".into(),
        num_servings: "1".into(),
        energy: "230".into(),
        carbs: "25.5".into(),
        fat: "9".into(),
        protein: "20".into(),
    };
    handle.submit_form(&form).await?;
    expect(&handle, "create", |s| s.state == AcquisitionState::Created).await?;
    handle.add_to_pantry().await?;
    expect(&handle, "pantry", |s| s.state == AcquisitionState::AddedToPantry).await?;

    // -------------------------------------------------------------------------
    // Summary
    // -------------------------------------------------------------------------
    let stats = pipeline.stats();
    pipeline.shutdown();
    handle.shutdown().await?;
    printer.await.ok();

    println!();
    println!("✓ Frames submitted: {}", stats.submitted);
    println!("✓ Frames analyzed:  {}", stats.analyzed);
    println!("✓ Frames dropped:   {}", stats.dropped);
    println!("✓ Detector errors:  {}", stats.failed);

    Ok(())
}

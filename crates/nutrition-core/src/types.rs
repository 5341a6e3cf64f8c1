//! # Domain Types
//!
//! Core domain types used throughout the scanner.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Frame       │   │ DetectionResult │   │  ProductRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  data (bytes)   │──►│  codes []       │   │  barcode        │       │
//! │  │  width, height  │   │  width, height  │   │  brand, name    │       │
//! │  └─────────────────┘   └────────┬────────┘   │  nutrients      │       │
//! │                                 │            └─────────────────┘       │
//! │                        ┌────────▼────────┐                             │
//! │                        │  DetectedCode   │   ┌─────────────────┐       │
//! │                        │  raw_value      │   │   NewProduct    │       │
//! │                        │  symbology      │   │ (validated form)│       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Frames are ephemeral: the pipeline owns one for exactly one analysis
//! call. Everything else here is an immutable value.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::quantity::Quantity;

// =============================================================================
// Frame
// =============================================================================

/// A single camera frame handed to the analysis pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Opaque image buffer (format is the detector's business).
    pub data: Vec<u8>,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,
}

impl Frame {
    /// Creates a frame from a raw buffer.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Frame {
            data,
            width,
            height,
        }
    }
}

// Image buffers are large; keep them out of logs.
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// =============================================================================
// Symbology
// =============================================================================

/// Barcode format reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Code39,
    Code93,
    Codabar,
    Itf,
    QrCode,
    DataMatrix,
    Pdf417,
    Aztec,
    /// The detector could not classify the format.
    Unknown,
}

impl Symbology {
    /// Returns true for the one-dimensional retail product formats.
    pub fn is_retail(&self) -> bool {
        matches!(
            self,
            Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA | Symbology::UpcE
        )
    }

    /// Stable lowercase name, used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Code128 => "code128",
            Symbology::Code39 => "code39",
            Symbology::Code93 => "code93",
            Symbology::Codabar => "codabar",
            Symbology::Itf => "itf",
            Symbology::QrCode => "qr_code",
            Symbology::DataMatrix => "data_matrix",
            Symbology::Pdf417 => "pdf417",
            Symbology::Aztec => "aztec",
            Symbology::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Symbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ean13" | "ean_13" => Ok(Symbology::Ean13),
            "ean8" | "ean_8" => Ok(Symbology::Ean8),
            "upc_a" | "upca" => Ok(Symbology::UpcA),
            "upc_e" | "upce" => Ok(Symbology::UpcE),
            "code128" | "code_128" => Ok(Symbology::Code128),
            "code39" | "code_39" => Ok(Symbology::Code39),
            "code93" | "code_93" => Ok(Symbology::Code93),
            "codabar" => Ok(Symbology::Codabar),
            "itf" => Ok(Symbology::Itf),
            "qr_code" | "qr" => Ok(Symbology::QrCode),
            "data_matrix" | "datamatrix" => Ok(Symbology::DataMatrix),
            "pdf417" => Ok(Symbology::Pdf417),
            "aztec" => Ok(Symbology::Aztec),
            "unknown" => Ok(Symbology::Unknown),
            other => Err(format!("Unknown symbology: '{}'", other)),
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// One decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DetectedCode {
    /// Decoded payload.
    pub raw_value: String,

    /// Format of the barcode.
    pub symbology: Symbology,
}

impl DetectedCode {
    /// Creates a detected code.
    pub fn new(raw_value: impl Into<String>, symbology: Symbology) -> Self {
        DetectedCode {
            raw_value: raw_value.into(),
            symbology,
        }
    }
}

/// Result of analysing one frame.
///
/// Always carries the frame geometry, even when no codes were found, so the
/// presentation layer can scale overlays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DetectionResult {
    /// Codes in the order the detector reported them.
    pub codes: Vec<DetectedCode>,

    /// Width of the analysed frame.
    pub width: u32,

    /// Height of the analysed frame.
    pub height: u32,
}

impl DetectionResult {
    /// Creates a detection result.
    pub fn new(codes: Vec<DetectedCode>, width: u32, height: u32) -> Self {
        DetectionResult {
            codes,
            width,
            height,
        }
    }

    /// An empty result for a frame of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(Vec::new(), width, height)
    }

    /// Returns true if no codes were decoded.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Picks the winning code: the first reported one with a non-empty payload
    /// whose symbology passes `accept`.
    pub fn first_code<F>(&self, accept: F) -> Option<&DetectedCode>
    where
        F: Fn(Symbology) -> bool,
    {
        self.codes
            .iter()
            .find(|c| !c.raw_value.trim().is_empty() && accept(c.symbology))
    }
}

// =============================================================================
// Product Record
// =============================================================================

/// A food product as returned by a lookup or creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Barcode the product is registered under.
    pub barcode: String,

    #[serde(default)]
    pub brand: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Package weight.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub weight: Option<Quantity>,

    /// Number of servings per package.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub num_servings: Option<Quantity>,

    /// Energy per package (kcal).
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub energy: Option<Quantity>,

    /// Carbohydrates per package (g).
    #[serde(default, alias = "carbsG")]
    #[ts(as = "Option<String>")]
    pub carbs: Option<Quantity>,

    /// Fat per package (g).
    #[serde(default, alias = "fatG")]
    #[ts(as = "Option<String>")]
    pub fat: Option<Quantity>,

    /// Protein per package (g).
    #[serde(default, alias = "proteinG")]
    #[ts(as = "Option<String>")]
    pub protein: Option<Quantity>,
}

impl ProductRecord {
    /// Creates a record with only a barcode set.
    pub fn new(barcode: impl Into<String>) -> Self {
        ProductRecord {
            barcode: barcode.into(),
            brand: None,
            name: None,
            weight: None,
            num_servings: None,
            energy: None,
            carbs: None,
            fat: None,
            protein: None,
        }
    }

    /// Human-readable label: "Brand Name", falling back to the barcode.
    pub fn display_name(&self) -> String {
        match (self.brand.as_deref(), self.name.as_deref()) {
            (Some(brand), Some(name)) => format!("{} {}", brand, name),
            (None, Some(name)) => name.to_string(),
            (Some(brand), None) => brand.to_string(),
            (None, None) => self.barcode.clone(),
        }
    }

    /// Divides a per-package amount by the serving count.
    ///
    /// `None` when either the amount or the serving count is missing or the
    /// serving count is zero.
    pub fn per_serving(&self, amount: Option<Quantity>) -> Option<Quantity> {
        amount?.divide_by(self.num_servings?)
    }

    /// Energy per serving.
    pub fn energy_per_serving(&self) -> Option<Quantity> {
        self.per_serving(self.energy)
    }
}

impl From<NewProduct> for ProductRecord {
    fn from(p: NewProduct) -> Self {
        ProductRecord {
            barcode: p.barcode,
            brand: p.brand,
            name: Some(p.name),
            weight: p.weight,
            num_servings: p.num_servings,
            energy: p.energy,
            carbs: p.carbs,
            fat: p.fat,
            protein: p.protein,
        }
    }
}

// =============================================================================
// Manual Product Form
// =============================================================================

/// Raw manual-entry form, exactly as typed by the user.
///
/// Turned into a [`NewProduct`] by [`crate::validation::validate_product_form`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    pub barcode: String,
    pub brand: String,
    pub name: String,
    pub weight: String,
    pub num_servings: String,
    pub energy: String,
    pub carbs: String,
    pub fat: String,
    pub protein: String,
}

/// A validated product ready to be sent to `createProduct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub barcode: String,
    pub brand: Option<String>,
    pub name: String,
    pub weight: Option<Quantity>,
    pub num_servings: Option<Quantity>,
    pub energy: Option<Quantity>,
    pub carbs: Option<Quantity>,
    pub fat: Option<Quantity>,
    pub protein: Option<Quantity>,
}

// =============================================================================
// Session Identity
// =============================================================================

/// Identifies one acquisition session.
///
/// A fresh id is minted on creation and on every reset; service completions
/// carry the id of the session that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session id.
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// One segment of a GraphQL error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(u64),
}

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServerError {
    /// Message shown verbatim to the user.
    pub message: String,

    /// Path of the response field that failed.
    #[serde(default)]
    pub path: Vec<PathSegment>,
}

impl ServerError {
    /// Creates a server error without a path.
    pub fn new(message: impl Into<String>) -> Self {
        ServerError {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.message);
        }

        let path: Vec<String> = self
            .path
            .iter()
            .map(|seg| match seg {
                PathSegment::Field(name) => name.clone(),
                PathSegment::Index(i) => i.to_string(),
            })
            .collect();
        write!(f, "{} (at {})", self.message, path.join("."))
    }
}

// =============================================================================
// Service Results
// =============================================================================

/// Result of `lookupByCode`: `Ok(None)` means "not found".
pub type LookupResult = Result<Option<ProductRecord>, ServiceError>;

/// Result of `createProduct`.
pub type CreateResult = Result<ProductRecord, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_code_takes_first_reported() {
        let result = DetectionResult::new(
            vec![
                DetectedCode::new("", Symbology::Ean13),
                DetectedCode::new("https://example.com", Symbology::QrCode),
                DetectedCode::new("4006381333931", Symbology::Ean13),
            ],
            640,
            480,
        );

        let any = result.first_code(|_| true).unwrap();
        assert_eq!(any.raw_value, "https://example.com");

        let retail = result.first_code(|s| s.is_retail()).unwrap();
        assert_eq!(retail.raw_value, "4006381333931");

        assert!(DetectionResult::empty(640, 480).first_code(|_| true).is_none());
    }

    #[test]
    fn test_symbology_parsing() {
        assert_eq!("EAN-13".parse::<Symbology>().unwrap(), Symbology::Ean13);
        assert_eq!("upc_a".parse::<Symbology>().unwrap(), Symbology::UpcA);
        assert_eq!("qr".parse::<Symbology>().unwrap(), Symbology::QrCode);
        assert!("morse".parse::<Symbology>().is_err());

        for s in [Symbology::Code128, Symbology::DataMatrix, Symbology::UpcE] {
            assert_eq!(s.as_str().parse::<Symbology>().unwrap(), s);
        }
    }

    #[test]
    fn test_frame_debug_hides_buffer() {
        let frame = Frame::new(vec![0u8; 1024], 32, 32);
        let debug = format!("{:?}", frame);
        assert!(debug.contains("bytes: 1024"));
        assert!(!debug.contains("[0, 0"));
    }

    #[test]
    fn test_product_display_name() {
        let mut product = ProductRecord::new("0123456789012");
        assert_eq!(product.display_name(), "0123456789012");

        product.name = Some("Bar".into());
        assert_eq!(product.display_name(), "Bar");

        product.brand = Some("Acme".into());
        assert_eq!(product.display_name(), "Acme Bar");
    }

    #[test]
    fn test_per_serving() {
        let mut product = ProductRecord::new("0123456789012");
        product.energy = Some(Quantity::from_units(500));
        assert_eq!(product.energy_per_serving(), None);

        product.num_servings = Some(Quantity::from_units(4));
        assert_eq!(product.energy_per_serving(), Some(Quantity::from_units(125)));

        product.num_servings = Some(Quantity::zero());
        assert_eq!(product.energy_per_serving(), None);
    }

    #[test]
    fn test_product_record_decodes_backend_json() {
        let json = r#"{
            "barcode": "0123456789012",
            "brand": "Acme",
            "name": "Bar",
            "weight": "50.00",
            "numServings": "1.00",
            "energy": 230,
            "carbsG": "25.5",
            "fatG": "11.00",
            "proteinG": null
        }"#;

        let product: ProductRecord = serde_json::from_str(json).unwrap();
        assert_eq!(product.barcode, "0123456789012");
        assert_eq!(product.carbs, Some(Quantity::from_hundredths(2550)));
        assert_eq!(product.energy, Some(Quantity::from_units(230)));
        assert_eq!(product.protein, None);
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError {
            message: "boom".into(),
            path: vec![
                PathSegment::Field("getFoodProductByBarcode".into()),
                PathSegment::Index(0),
            ],
        };
        assert_eq!(err.to_string(), "boom (at getFoodProductByBarcode.0)");
        assert_eq!(ServerError::new("plain").to_string(), "plain");
    }
}

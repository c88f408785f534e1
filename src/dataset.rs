use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Fields read as numbers; every other CSV column is kept as text
pub const NUMERIC_FIELDS: [&str; 6] = ["price", "sqft", "beds", "baths", "yearBuilt", "lotSize"];

/// A single raw listing record
///
/// Fields are kept exactly as loaded so that metadata the scorer never reads
/// (address, url, ids, ...) round-trips into the scored output unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Listing {
    pub fields: Map<String, Value>,
}

impl Listing {
    /// Create an empty listing
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Builder-style field insertion
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.add_field(key, value);
        self
    }

    /// Add or replace a field
    pub fn add_field(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Get a raw field value
    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric value of a field; numeric strings are parsed, everything else is `None`
    pub fn get_numeric(&self, key: &str) -> Option<f64> {
        match self.get_field(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-empty string value of a field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get_field(key)? {
            Value::String(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        self.get_numeric("price")
    }

    pub fn sqft(&self) -> Option<f64> {
        self.get_numeric("sqft")
    }

    pub fn beds(&self) -> Option<f64> {
        self.get_numeric("beds")
    }

    pub fn baths(&self) -> Option<f64> {
        self.get_numeric("baths")
    }

    pub fn year_built(&self) -> Option<f64> {
        self.get_numeric("yearBuilt")
    }

    pub fn lot_size(&self) -> Option<f64> {
        self.get_numeric("lotSize")
    }

    pub fn sold_date(&self) -> Option<&str> {
        self.get_str("soldDate")
    }

    pub fn city(&self) -> Option<&str> {
        self.get_str("city")
    }

    pub fn address(&self) -> Option<&str> {
        self.get_str("address")
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str("url")
    }

    /// A listing with a sold date is a closed sale, otherwise it is for sale
    pub fn is_sold(&self) -> bool {
        self.sold_date().is_some()
    }

    /// Copy of the listing with the given keys removed
    pub fn without(&self, keys: &[&str]) -> Self {
        let mut listing = self.clone();
        for key in keys {
            listing.fields.remove(*key);
        }
        listing
    }
}

/// Top-level listing document, either `{"properties": [...]}` or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum ListingDocument {
    Array(Vec<Listing>),
    Document { properties: Vec<Listing> },
}

/// A named collection of listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSet {
    pub name: String,
    pub listings: Vec<Listing>,
}

impl ListingSet {
    /// Create a new empty listing set
    pub fn new(name: String) -> Self {
        Self {
            name,
            listings: Vec::new(),
        }
    }

    pub fn add_listing(&mut self, listing: Listing) {
        self.listings.push(listing);
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Load listings from JSON
    pub fn from_json(name: String, json_data: &str) -> crate::Result<Self> {
        let document: ListingDocument =
            serde_json::from_str(json_data).context("Failed to parse listings JSON")?;
        let listings = match document {
            ListingDocument::Array(listings) => listings,
            ListingDocument::Document { properties } => properties,
        };
        Ok(Self { name, listings })
    }

    /// Load listings from CSV with a header row
    ///
    /// Cells in `NUMERIC_FIELDS` columns become JSON numbers when they parse;
    /// other columns (zip codes, ids, ...) stay as the original text. Empty
    /// cells are left out.
    pub fn from_csv(name: String, csv_data: &str) -> crate::Result<Self> {
        let mut set = ListingSet::new(name);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let headers = reader.headers()?.clone();

        for result in reader.records() {
            let record = result?;
            let mut listing = Listing::new();

            for (i, cell) in record.iter().enumerate() {
                let Some(header) = headers.get(i) else {
                    continue;
                };
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                if NUMERIC_FIELDS.contains(&header) {
                    listing.add_field(header, csv_cell_value(cell));
                } else {
                    listing.add_field(header, cell);
                }
            }
            set.add_listing(listing);
        }

        Ok(set)
    }

    /// Load listings from a file, CSV by extension and JSON otherwise
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read listings from {:?}", path))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "listings".to_string());

        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_csv {
            Self::from_csv(name, &content)
        } else {
            Self::from_json(name, &content)
        }
    }
}

fn csv_cell_value(cell: &str) -> Value {
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_listing_accessors() {
        let listing = Listing::new()
            .with("price", 350_000)
            .with("sqft", "1800")
            .with("beds", 3)
            .with("city", "Providence")
            .with("soldDate", "");

        assert_eq!(listing.price(), Some(350_000.0));
        assert_eq!(listing.sqft(), Some(1800.0));
        assert_eq!(listing.beds(), Some(3.0));
        assert_eq!(listing.baths(), None);
        assert_eq!(listing.city(), Some("Providence"));
        assert!(!listing.is_sold());
    }

    #[test]
    fn test_listing_null_fields() {
        let listing: Listing =
            serde_json::from_value(json!({"price": 200000, "baths": null, "soldDate": null}))
                .unwrap();
        assert_eq!(listing.baths(), None);
        assert!(!listing.is_sold());
    }

    #[test]
    fn test_listing_without() {
        let listing = Listing::new().with("price", 1).with("dealScore", 90);
        let stripped = listing.without(&["dealScore"]);
        assert!(stripped.get_field("dealScore").is_none());
        assert_eq!(stripped.price(), Some(1.0));
    }

    #[test]
    fn test_json_document_loading() {
        let json_data = r#"{"properties": [
            {"price": 300000, "sqft": 1500, "beds": 3, "address": "1 Main St", "mlsId": "A1"},
            {"price": 450000, "sqft": 2100, "beds": 4, "soldDate": "August-14-2024"}
        ]}"#;
        let set = ListingSet::from_json("ri".to_string(), json_data).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.listings[0].address(), Some("1 Main St"));
        assert_eq!(set.listings[0].get_field("mlsId"), Some(&json!("A1")));
        assert!(set.listings[1].is_sold());
    }

    #[test]
    fn test_json_array_loading() {
        let json_data = r#"[{"price": 300000, "sqft": 1500, "beds": 3}]"#;
        let set = ListingSet::from_json("ri".to_string(), json_data).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.listings[0].price(), Some(300_000.0));
    }

    #[test]
    fn test_json_invalid() {
        assert!(ListingSet::from_json("bad".to_string(), "{\"nope\": 1}").is_err());
    }

    #[test]
    fn test_csv_loading() {
        let csv_data = "price,sqft,beds,baths,city\n300000,1500,3,2.5,Cranston\n450000,2100,4,,Warwick";
        let set = ListingSet::from_csv("ri".to_string(), csv_data).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.listings[0].baths(), Some(2.5));
        assert_eq!(set.listings[0].city(), Some("Cranston"));
        assert_eq!(set.listings[1].baths(), None);
        assert_eq!(set.listings[1].get_field("price"), Some(&json!(450000)));
    }

    #[test]
    fn test_csv_metadata_kept_as_text() {
        let csv_data = "price,sqft,beds,zip,mlsId,city\n300000,1500,3,02903,000123,Providence";
        let set = ListingSet::from_csv("ri".to_string(), csv_data).unwrap();
        let listing = &set.listings[0];

        assert_eq!(listing.get_field("zip"), Some(&json!("02903")));
        assert_eq!(listing.get_field("mlsId"), Some(&json!("000123")));
        assert_eq!(listing.get_field("sqft"), Some(&json!(1500)));
        assert_eq!(listing.price(), Some(300_000.0));
    }

    #[test]
    fn test_from_path_dispatches_on_extension() {
        let mut csv_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(csv_file, "price,sqft,beds\n300000,1500,3").unwrap();
        let set = ListingSet::from_path(csv_file.path()).unwrap();
        assert_eq!(set.len(), 1);

        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json_file, "[{{\"price\": 1, \"sqft\": 2, \"beds\": 3}}]").unwrap();
        let set = ListingSet::from_path(json_file.path()).unwrap();
        assert_eq!(set.len(), 1);
    }
}

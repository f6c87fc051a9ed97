//! Google Sheets ingestion.
//!
//! The spreadsheet holds one sheet per product model. Each sheet is
//! row-oriented: the first cell of a row names what the row holds (name,
//! price, code), and the rows after the sizes marker each describe one size,
//! with the size value in the first column and an availability sign in each
//! product column. Columns after the first are products.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::models::NewCustom;

/// Row-title layout of a model sheet.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    /// First-cell title of the product-name row.
    pub name_row: String,

    /// First-cell title of the price row.
    pub price_row: String,

    /// First-cell title of the code row.
    pub code_row: String,

    /// First-cell title of the marker row preceding the size rows.
    pub sizes_row: String,

    /// Cell content marking a size as available for a product.
    pub available_sign: String,
}

/// Source of customs data, one fetch per sync tick.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch every custom from every model sheet.
    async fn fetch_all(&self) -> Result<Vec<NewCustom>>;
}

/// Google Sheets v4 REST client (API-key based).
pub struct GoogleSheets {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: String,
    layout: SheetLayout,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl GoogleSheets {
    pub fn new(spreadsheet_id: String, api_key: String, layout: SheetLayout) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            spreadsheet_id,
            api_key,
            layout,
        }
    }

    /// Titles of all sheets in the spreadsheet; one sheet per model.
    async fn sheet_titles(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/{}?fields=sheets.properties.title&key={}",
            self.base_url, self.spreadsheet_id, self.api_key
        );

        let meta: SpreadsheetMeta = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to fetch spreadsheet metadata")?
            .error_for_status()
            .context("spreadsheet metadata request rejected")?
            .json()
            .await
            .context("failed to decode spreadsheet metadata")?;

        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    /// Full cell grid of one model sheet.
    async fn sheet_values(&self, title: &str) -> Result<Vec<Vec<String>>> {
        let url = format!(
            "{}/{}/values/{}?key={}",
            self.base_url,
            self.spreadsheet_id,
            urlencode(title),
            self.api_key
        );

        let range: ValueRange = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch sheet '{title}'"))?
            .error_for_status()
            .with_context(|| format!("sheet '{title}' request rejected"))?
            .json()
            .await
            .with_context(|| format!("failed to decode sheet '{title}'"))?;

        Ok(range.values)
    }
}

#[async_trait]
impl SheetSource for GoogleSheets {
    async fn fetch_all(&self) -> Result<Vec<NewCustom>> {
        let titles = self.sheet_titles().await?;

        let mut customs = Vec::new();
        for title in titles {
            let grid = self.sheet_values(&title).await?;
            match parse_grid(&title, &grid, &self.layout) {
                Ok(mut parsed) => customs.append(&mut parsed),
                Err(e) => warn!(model = %title, error = %e, "skipping unparseable model sheet"),
            }
        }

        Ok(customs)
    }
}

/// Reconstruct the customs of one model sheet from its cell grid.
///
/// Columns after the first (row titles) are products. A product's sizes are
/// the size rows whose cell in its column equals the availability sign.
pub fn parse_grid(model: &str, grid: &[Vec<String>], layout: &SheetLayout) -> Result<Vec<NewCustom>> {
    let names = title_row(grid, &layout.name_row)?;
    let prices = title_row(grid, &layout.price_row)?;
    let codes = title_row(grid, &layout.code_row)?;

    let sizes_start = grid
        .iter()
        .position(|row| first_cell(row) == layout.sizes_row)
        .map(|i| i + 1)
        .ok_or_else(|| missing_row(&layout.sizes_row))?;
    let size_rows = &grid[sizes_start..];

    let mut customs = Vec::new();

    // Column 0 holds the row titles; products start at column 1.
    for column in 1..names.len() {
        let name = names[column].trim();
        let price = cell(prices, column).trim().parse::<i32>();
        let code = cell(codes, column).trim().parse::<i32>();

        let (price, code) = match (price, code) {
            (Ok(price), Ok(code)) => (price, code),
            _ => {
                warn!(model, column, "skipping column with unparseable price or code");
                continue;
            }
        };

        let sizes = size_rows
            .iter()
            .filter(|row| cell(row, column) == layout.available_sign)
            .filter_map(|row| first_cell(row).parse::<i32>().ok())
            .collect();

        customs.push(NewCustom {
            code,
            model: model.trim().to_string(),
            name: name.to_string(),
            price,
            sizes,
        });
    }

    Ok(customs)
}

/// Find the row whose first cell matches a configured title.
fn title_row<'a>(grid: &'a [Vec<String>], title: &str) -> Result<&'a [String]> {
    grid.iter()
        .find(|row| first_cell(row) == title)
        .map(Vec::as_slice)
        .ok_or_else(|| missing_row(title))
}

fn missing_row(title: &str) -> anyhow::Error {
    anyhow!("can not load customs of row {title}, maybe the configured row title is wrong")
}

fn first_cell(row: &[String]) -> &str {
    row.first().map(String::as_str).unwrap_or("").trim()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Percent-encode a sheet title for use as a values range.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

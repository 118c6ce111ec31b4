//! Cell values as they come out of a decoded spreadsheet

use serde::{Deserialize, Serialize};

/// An opaque scalar cell value.
///
/// Merge logic never converts between variants. It only asks whether a cell
/// is blank and how it renders as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Text value, stored verbatim
    Text(String),
    /// Numeric value (spreadsheets store every number as a double)
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Absent or null cell
    Empty,
}

impl CellValue {
    /// Build a cell from a raw text field, detecting numbers.
    ///
    /// Text that is not a number is kept untrimmed.
    pub fn parse_text(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Empty;
        }

        match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(s.to_string()),
        }
    }

    /// Render the value as text
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => render_number(*n),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// True for an absent cell or text that trims to nothing.
    /// `0` and `false` are not blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Boolean(_) => false,
        }
    }

    /// Header text for this cell. Falsy values (empty, `""`, `0`, `NaN`,
    /// `false`) all become the empty string.
    pub fn header_text(&self) -> String {
        let falsy = match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Boolean(b) => !b,
        };
        if falsy {
            String::new()
        } else {
            self.render().trim().to_string()
        }
    }

    /// Check if the cell is absent
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Shortest round-trip digits. Magnitudes from 1e21 up and below 1e-6 use
/// exponent form with an explicit sign (`1e+21`, `1.5e-7`).
fn render_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
            _ => exp,
        };
    }
    n.to_string()
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

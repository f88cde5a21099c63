//! Bulk catalog loading from comma-separated files.
//!
//! Expected columns, after a header line:
//! `id,name,price,discontinued,manufacturer,type,pack_size,composition_1,composition_2`

use sqlx::SqlitePool;
use thiserror::Error;

const COLUMNS: usize = 9;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("line {line}: expected {} columns, found {found}", COLUMNS)]
    ColumnCount { line: usize, found: usize },
    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub discontinued: bool,
    pub manufacturer: Option<String>,
    pub medicine_type: Option<String>,
    pub pack_size: Option<String>,
    pub composition_primary: Option<String>,
    pub composition_secondary: Option<String>,
}

/// Splits one line into fields, honouring double-quoted fields with embedded
/// commas and `""` escapes.
fn split_fields(raw: &str, line: usize) -> Result<Vec<String>, ImportError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::UnterminatedQuote { line });
    }
    fields.push(current);
    Ok(fields)
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_flag(value: &str, line: usize) -> Result<bool, ImportError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" | "" => Ok(false),
        _ => Err(ImportError::InvalidField {
            line,
            field: "discontinued",
            value: value.to_string(),
        }),
    }
}

impl ImportRecord {
    /// Parses one data row. `line` is the 1-based line number used in errors.
    pub fn parse(raw: &str, line: usize) -> Result<Self, ImportError> {
        let fields = split_fields(raw, line)?;
        if fields.len() != COLUMNS {
            return Err(ImportError::ColumnCount {
                line,
                found: fields.len(),
            });
        }

        let invalid = |field: &'static str, value: &str| ImportError::InvalidField {
            line,
            field,
            value: value.to_string(),
        };

        let id = fields[0]
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("id", &fields[0]))?;
        let name = optional(&fields[1]).ok_or_else(|| invalid("name", &fields[1]))?;
        let price = fields[2]
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| invalid("price", &fields[2]))?;

        Ok(Self {
            id,
            name,
            price,
            discontinued: parse_flag(&fields[3], line)?,
            manufacturer: optional(&fields[4]),
            medicine_type: optional(&fields[5]),
            pack_size: optional(&fields[6]),
            composition_primary: optional(&fields[7]),
            composition_secondary: optional(&fields[8]),
        })
    }
}

/// Parses a whole file: skips the header line and blank lines.
pub fn parse_catalog(contents: &str) -> Result<Vec<ImportRecord>, ImportError> {
    contents
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(index, raw)| ImportRecord::parse(raw, index + 1))
        .collect()
}

/// Upserts every record by id in one transaction.
///
/// New medicines start with `default_stock` units; existing ones keep their
/// current stock.
pub async fn import_records(
    pool: &SqlitePool,
    records: &[ImportRecord],
    default_stock: i64,
) -> Result<usize, ImportError> {
    let mut transaction = pool.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO medicines (id, name, price, quantity, discontinued, manufacturer, medicine_type, pack_size, composition_primary, composition_secondary)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                discontinued = excluded.discontinued,
                manufacturer = excluded.manufacturer,
                medicine_type = excluded.medicine_type,
                pack_size = excluded.pack_size,
                composition_primary = excluded.composition_primary,
                composition_secondary = excluded.composition_secondary",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.price)
        .bind(default_stock)
        .bind(record.discontinued)
        .bind(&record.manufacturer)
        .bind(&record.medicine_type)
        .bind(&record.pack_size)
        .bind(&record.composition_primary)
        .bind(&record.composition_secondary)
        .execute(&mut *transaction)
        .await?;
    }

    transaction.commit().await?;
    log::info!("Imported {} medicine(s)", records.len());
    Ok(records.len())
}

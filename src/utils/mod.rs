use chrono::NaiveDateTime;

/// Helper function to format an order timestamp
///
/// Formats a UTC `NaiveDateTime` as "dd-mm-yyyy HH:MM".
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%d-%m-%Y %H:%M").to_string()
}

/// Formats a price with two decimals.
pub fn format_price(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Helper function to escape special characters for HTML
///
/// Every piece of user- or catalog-supplied text goes through this before it
/// is placed in a page, both in element content and in attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Percent-encodes a query string value.
pub fn encode_query(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

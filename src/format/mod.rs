//! Display helpers for money and dates.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Render an amount in minor units, e.g. `format_currency(1500, "USD") == "$15.00"`.
pub fn format_currency(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let major = abs / 100;
    let minor = abs % 100;

    match currency_symbol(currency) {
        Some(symbol) => format!("{}{}{}.{:02}", sign, symbol, group_thousands(major), minor),
        None => format!(
            "{}{} {}.{:02}",
            sign,
            currency.to_uppercase(),
            group_thousands(major),
            minor
        ),
    }
}

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency.to_uppercase().as_str() {
        "USD" | "CAD" | "AUD" | "NZD" | "MXN" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        "INR" => Some("₹"),
        _ => None,
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Long date as shown in host application notices, e.g. `March 4, 2019`.
pub fn format_long_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Card expiry from processor data, `MM/YYYY`.
pub fn format_card_expiry(month: u32, year: i32) -> String {
    format!("{:02}/{}", month, year)
}

/// Numeric month/year for a stored expiry date; unparseable values are shown as-is.
pub fn format_month_year(raw: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());

    match parsed {
        Some(date) => format!("{}/{}", date.month(), date.year()),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_currency_symbols() {
        assert_eq!(format_currency(1500, "USD"), "$15.00");
        assert_eq!(format_currency(50, "eur"), "€0.50");
        assert_eq!(format_currency(123456789, "GBP"), "£1,234,567.89");
        assert_eq!(format_currency(-250, "USD"), "-$2.50");
    }

    #[test]
    fn test_format_currency_unknown_code() {
        assert_eq!(format_currency(2000, "sek"), "SEK 20.00");
    }

    #[test]
    fn test_format_long_date() {
        let at = Utc.with_ymd_and_hms(2019, 3, 4, 10, 0, 0).unwrap();
        assert_eq!(format_long_date(&at), "March 4, 2019");
    }

    #[test]
    fn test_format_month_year() {
        assert_eq!(format_month_year("2026-07-31T00:00:00Z"), "7/2026");
        assert_eq!(format_month_year("2025-12-01"), "12/2025");
        assert_eq!(format_month_year("2025-01"), "2025-01");
        assert_eq!(format_card_expiry(3, 2027), "03/2027");
    }
}

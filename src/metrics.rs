// 💰 Derived Metrics - Earnings and presentation formatting
//
// These appear in exported financial documents, so the arithmetic is fixed:
//   host_usd   = crystals / 10000
//   agency_usd = (crystals * 0.1) / 10000
// Formatting helpers are presentation-only and never feed back into arithmetic.

/// Crystals earned per USD paid to the host
pub const CRYSTALS_PER_USD: f64 = 10000.0;

/// Agency share of host earnings
pub const AGENCY_SHARE: f64 = 0.1;

pub fn calculate_host_usd(host_crystals: i64) -> f64 {
    host_crystals as f64 / CRYSTALS_PER_USD
}

pub fn calculate_agency_usd(host_crystals: i64) -> f64 {
    (host_crystals as f64 * AGENCY_SHARE) / CRYSTALS_PER_USD
}

/// Sum of stored counters, pinned at `i64::MAX` instead of wrapping
pub fn saturating_total<I: IntoIterator<Item = i64>>(values: I) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// 135 -> "2:15"
pub fn format_minutes_to_hours(minutes: i64) -> String {
    let hours = minutes.div_euclid(60);
    let mins = minutes.rem_euclid(60);
    format!("{}:{:02}", hours, mins)
}

/// pt-BR thousands grouping: 1234567 -> "1.234.567"
pub fn format_number(num: i64) -> String {
    let digits = num.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if num < 0 {
        grouped.push('-');
    }

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    grouped
}

/// "$1234.50" with two decimals
pub fn format_currency(value: f64) -> String {
    format!("${}", to_fixed_2(value))
}

/// Two-decimal rendering with exact ties rounded away from zero.
///
/// `format!("{:.2}")` rounds exact ties to even (0.125 -> "0.12"); published
/// figures round them up (0.125 -> "0.13"). A double can only sit exactly on a
/// two-decimal tie when it is an odd multiple of 1/8.
fn to_fixed_2(value: f64) -> String {
    let eighths = value * 8.0;
    let is_tie = value.is_finite()
        && eighths.abs() < 9.0e15
        && eighths.fract() == 0.0
        && (eighths as i64) % 2 != 0;

    if is_tie {
        format!("{:.2}", value + value.signum() * 0.001)
    } else {
        format!("{:.2}", value)
    }
}

/// Parse user-typed numbers like "1.500", "$2,000" or "15 000"; 0 when nothing parses.
///
/// After dropping everything but digits and `-`, only the leading `-?digits`
/// run is read, so "10-20" is 10.
pub fn parse_formatted_number(s: &str) -> i64 {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();

    let digits = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let number_len = cleaned.len() - digits.len() + end;

    cleaned[..number_len].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_agency_usd() {
        assert_eq!(calculate_host_usd(1_250_000), 125.0);
        assert_eq!(calculate_agency_usd(1_250_000), 12.5);
        assert_eq!(calculate_host_usd(0), 0.0);
        // Bit-for-bit: same expression order as the published formula
        assert_eq!(calculate_agency_usd(12_345), (12_345f64 * 0.1) / 10000.0);
    }

    #[test]
    fn test_minutes_to_hours() {
        assert_eq!(format_minutes_to_hours(0), "0:00");
        assert_eq!(format_minutes_to_hours(59), "0:59");
        assert_eq!(format_minutes_to_hours(60), "1:00");
        assert_eq!(format_minutes_to_hours(440), "7:20");
        assert_eq!(format_minutes_to_hours(1500), "25:00");
    }

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1.000");
        assert_eq!(format_number(1_234_567), "1.234.567");
        assert_eq!(format_number(-15_000), "-15.000");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(125.0), "$125.00");
        assert_eq!(format_currency(1.2345), "$1.23");
        assert_eq!(format_currency(calculate_host_usd(1250)), "$0.13");
        assert_eq!(format_currency(-0.375), "$-0.38");
        assert_eq!(format_currency(0.25), "$0.25");
    }

    #[test]
    fn test_parse_formatted_number() {
        assert_eq!(parse_formatted_number("15.000"), 15000);
        assert_eq!(parse_formatted_number("$2,500"), 2500);
        assert_eq!(parse_formatted_number("-30"), -30);
        assert_eq!(parse_formatted_number(""), 0);
        assert_eq!(parse_formatted_number("abc"), 0);
    }

    #[test]
    fn test_parse_formatted_number_leading_run() {
        assert_eq!(parse_formatted_number("10-20"), 10);
        assert_eq!(parse_formatted_number("-5-3"), -5);
        assert_eq!(parse_formatted_number("1.000 - 2.000"), 1000);
        assert_eq!(parse_formatted_number("--5"), 0);
        assert_eq!(parse_formatted_number("-"), 0);
    }
}

//! Formatting cent amounts for display.

/// Up to two decimals, trailing zeros dropped, with k/m/b suffixes:
/// 50 -> "0.5", 12_340_000 -> "123.4k".
pub fn short(cents: u64) -> String {
    let dollars = cents as f64 / 100.0;
    let (value, suffix) = if dollars >= 1e9 {
        (dollars / 1e9, "b")
    } else if dollars >= 1e6 {
        (dollars / 1e6, "m")
    } else if dollars >= 1e3 {
        (dollars / 1e3, "k")
    } else {
        (dollars, "")
    };
    format!("{}{}", trim_decimals(&format!("{:.2}", value)), suffix)
}

/// "$12.34"; whole amounts print without decimals ("$12"), "$12.5" keeps one.
pub fn dollars(cents: u64) -> String {
    let whole = cents / 100;
    let frac = cents % 100;
    if frac == 0 {
        format!("${}", whole)
    } else if frac % 10 == 0 {
        format!("${}.{}", whole, frac / 10)
    } else {
        format!("${}.{:02}", whole, frac)
    }
}

fn trim_decimals(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

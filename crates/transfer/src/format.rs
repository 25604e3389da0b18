const UNITS: [&str; 8] = ["B", "K", "M", "G", "T", "P", "E", "Z"];

/// Formats a byte count with binary (1024-based) units and one decimal.
///
/// `0` → `"0.0B"`, `1536` → `"1.5K"`; anything past zetta is shown in `Y`.
pub fn format_size<N: Into<u128>>(bytes: N) -> String {
    let mut value = bytes.into() as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}Y")
}

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size in 1024-based units, e.g. `1.5 KB`
///
/// Trailing zeros are dropped; sizes beyond the largest unit stay in GB.
pub fn format_bytes(bytes: u64, decimals: i32) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale = 1u64;
    while unit < UNITS.len() - 1 && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let precision = decimals.max(0) as usize;
    let mut value = format!("{:.*}", precision, bytes as f64 / scale as f64);
    if value.contains('.') {
        value = value.trim_end_matches('0').trim_end_matches('.').to_string();
    }

    format!("{} {}", value, UNITS[unit])
}

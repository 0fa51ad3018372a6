const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub fn pretty_size_from_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(pretty_size_from_bytes(512), "512 B");
        assert_eq!(pretty_size_from_bytes(2048), "2.00 KB");
        assert_eq!(pretty_size_from_bytes(64 * 1024 * 1024), "64.00 MB");
        assert_eq!(pretty_size_from_bytes(3 << 40), "3.00 TB");
    }
}

/// Normalize a raw hardware address: insert colons every two characters
/// when the raw form has none, then uppercase.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains(':') {
        return trimmed.to_uppercase();
    }

    trimmed
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(":")
        .to_uppercase()
}

/// Last `n` hex characters of a MAC address, colons stripped.
pub fn hex_suffix(mac: &str, n: usize) -> String {
    let hex: String = mac.chars().filter(|c| *c != ':').collect();
    if hex.len() <= n {
        hex
    } else {
        hex[hex.len() - n..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_inserts_colons() {
        assert_eq!(normalize("aabbcc112233"), "AA:BB:CC:11:22:33");
    }

    #[test]
    fn test_normalize_keeps_existing_colons() {
        assert_eq!(normalize("aa:bb:cc:11:22:33"), "AA:BB:CC:11:22:33");
        assert_eq!(normalize(" AA:BB:CC:11:22:33 "), "AA:BB:CC:11:22:33");
    }

    #[test]
    fn test_hex_suffix() {
        assert_eq!(hex_suffix("AA:BB:CC:11:22:33", 6), "112233");
        assert_eq!(hex_suffix("AABB", 6), "AABB");
        assert_eq!(hex_suffix("UNKNOWN", 6), "NKNOWN");
    }
}

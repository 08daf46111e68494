//! Info-hash normalization.
//!
//! BitTorrent info-hashes appear in the wild in three shapes: 40-character hex
//! (either case), 32-character Base32 (magnet `xt=urn:btih:` links sometimes
//! use this form), and embedded inside a full magnet URI. Every boundary that
//! accepts a hash from the outside world (feed parsing, torrent-client
//! responses, manual submission) must normalize through this module so a
//! case or encoding mismatch never causes a silent dedup miss.

const HEX_LEN: usize = 40;
const BASE32_LEN: usize = 32;

/// Normalize an info-hash to its canonical 40-character uppercase hex form.
///
/// Accepts either a 40-character hex string or a 32-character Base32 string
/// (per BEP 3's magnet URI allowance). Returns `None` if the input is neither.
#[must_use]
pub fn normalize_info_hash(input: &str) -> Option<String> {
    let trimmed = input.trim();
    match trimmed.len() {
        HEX_LEN if trimmed.bytes().all(|b| b.is_ascii_hexdigit()) => {
            Some(trimmed.to_ascii_uppercase())
        }
        BASE32_LEN => {
            let bytes = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, trimmed)?;
            if bytes.len() != 20 {
                return None;
            }
            Some(hex_encode_upper(&bytes))
        }
        _ => None,
    }
}

/// Extract and normalize the `xt=urn:btih:<hash>` parameter from a magnet URI.
#[must_use]
pub fn extract_hash_from_magnet(uri: &str) -> Option<String> {
    let query = uri.strip_prefix("magnet:?")?;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        if key != "xt" {
            continue;
        }
        let candidate = value.strip_prefix("urn:btih:")?;
        if let Some(normalized) = normalize_info_hash(candidate) {
            return Some(normalized);
        }
    }
    None
}

fn hex_encode_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_lowercase_hex_to_uppercase() {
        let hash = "abcdef0123456789abcdef0123456789abcdef01";
        assert_eq!(normalize_info_hash(&hash[..40]), Some(hash[..40].to_ascii_uppercase()));
    }

    #[test]
    fn rejects_invalid_length() {
        assert_eq!(normalize_info_hash("too-short"), None);
    }

    #[test]
    fn round_trips_base32_to_hex() {
        let hex = "A94A8FE5CCB19BA61C4C0873D391E987982FBBD3";
        let twenty = &hex[..40];
        let bytes: Vec<u8> = (0..20)
            .map(|i| u8::from_str_radix(&twenty[i * 2..i * 2 + 2], 16).unwrap())
            .collect();
        let b32 = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes);
        assert_eq!(normalize_info_hash(&b32), Some(twenty.to_ascii_uppercase()));
    }

    #[test]
    fn extracts_hash_from_magnet_uri() {
        let uri = "magnet:?xt=urn:btih:ABCDEF0123456789ABCDEF0123456789ABCDEF01&dn=example";
        assert_eq!(
            extract_hash_from_magnet(uri),
            Some("ABCDEF0123456789ABCDEF0123456789ABCDEF01".to_string())
        );
    }

    #[test]
    fn magnet_without_btih_returns_none() {
        assert_eq!(extract_hash_from_magnet("magnet:?dn=example"), None);
    }
}

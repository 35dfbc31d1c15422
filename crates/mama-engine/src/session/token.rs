//! Session token generation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// New URL-safe session token drawn from the OS CSPRNG
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Short, non-reversible identifier for a token, safe to put in logs
pub fn fingerprint(token: &str) -> String {
    let hash = blake3::hash(token.as_bytes());
    let hex = hash.to_hex();
    hex.as_str()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_length_and_alphabet() {
        let token = generate_session_token();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_fingerprint_is_stable_and_not_a_prefix() {
        let token = generate_session_token();
        let fp = fingerprint(&token);
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, fingerprint(&token));
        assert!(!token.starts_with(&fp));
    }
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;

/// Bytes of entropy in a nonce.
const NONCE_BYTES: usize = 16;

/// Generates a fresh Content-Security-Policy nonce: 128 random bits,
/// base64-encoded. One per response.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 24);
        assert_eq!(STANDARD.decode(&nonce).unwrap().len(), NONCE_BYTES);
    }

    #[test]
    fn test_nonces_differ() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}

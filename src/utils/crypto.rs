// --- File: src/utils/crypto.rs ---

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Nonce,
};

const NONCE_LEN: usize = 12;

/// Encrypts plaintext using AES-256-GCM with a random nonce.
/// Prepends the 12-byte nonce to the ciphertext.
/// Key must be exactly 32 bytes.
pub fn encrypt(key_bytes: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, String> {
    let cipher = Aes256Gcm::new_from_slice(key_bytes)
        .map_err(|e| format!("Invalid encryption key length: {e}"))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| format!("Encryption failed: {e}"))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypts data previously encrypted with `encrypt`.
pub fn decrypt(key_bytes: &[u8], nonce_ciphertext: &[u8]) -> Result<Vec<u8>, String> {
    if nonce_ciphertext.len() <= NONCE_LEN {
        return Err("Ciphertext too short to contain nonce".to_string());
    }

    let cipher = Aes256Gcm::new_from_slice(key_bytes)
        .map_err(|e| format!("Invalid decryption key length: {e}"))?;

    let (nonce_bytes, ciphertext) = nonce_ciphertext.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| format!("Decryption failed (wrong key or tampered data): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypts_what_it_encrypts() {
        let key = [7u8; 32];
        let sealed = encrypt(&key, b"{\"token\":\"abc\"}").unwrap();
        assert_ne!(&sealed[NONCE_LEN..], b"{\"token\":\"abc\"}");
        assert_eq!(decrypt(&key, &sealed).unwrap(), b"{\"token\":\"abc\"}");
    }

    #[test]
    fn wrong_key_and_short_input_fail() {
        let sealed = encrypt(&[1u8; 32], b"secret").unwrap();
        assert!(decrypt(&[2u8; 32], &sealed).is_err());
        assert!(decrypt(&[1u8; 32], &sealed[..NONCE_LEN]).is_err());
        assert!(encrypt(&[1u8; 16], b"secret").is_err());
    }
}

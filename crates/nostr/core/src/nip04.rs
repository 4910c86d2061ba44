//! NIP-04: encrypted direct messages.
//!
//! The shared key is the x coordinate of the ECDH point between the sender's
//! secret key and the recipient's public key (taken with even parity). The
//! payload format is `<base64 ciphertext>?iv=<base64 iv>`.

use bitcoin::secp256k1::{PublicKey, SecretKey, ecdh};
use thiserror::Error;

use crate::keys::parse_hex32;

#[derive(Debug, Error)]
pub enum Nip04Error {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Symmetric encryption keyed by the 32-byte shared secret.
pub trait SymmetricCipher {
    fn encrypt(&self, shared_key: &[u8; 32], plaintext: &[u8]) -> Result<String, Nip04Error>;
    fn decrypt(&self, shared_key: &[u8; 32], payload: &str) -> Result<Vec<u8>, Nip04Error>;
}

/// X coordinate of the ECDH point for `secret_key` and the x-only `pubkey`.
pub fn shared_secret(secret_key: &[u8; 32], pubkey: &str) -> Result<[u8; 32], Nip04Error> {
    let sk = SecretKey::from_slice(secret_key).map_err(|e| Nip04Error::InvalidKey(e.to_string()))?;
    let x = parse_hex32(pubkey).map_err(|e| Nip04Error::InvalidKey(e.to_string()))?;

    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(&x);
    let pk = PublicKey::from_slice(&compressed).map_err(|e| Nip04Error::InvalidKey(e.to_string()))?;

    let point = ecdh::shared_secret_point(&pk, &sk);
    let mut shared = [0u8; 32];
    shared.copy_from_slice(&point[..32]);
    Ok(shared)
}

pub fn encrypt_with<C: SymmetricCipher + ?Sized>(
    cipher: &C,
    secret_key: &[u8; 32],
    pubkey: &str,
    text: &str,
) -> Result<String, Nip04Error> {
    cipher.encrypt(&shared_secret(secret_key, pubkey)?, text.as_bytes())
}

pub fn decrypt_with<C: SymmetricCipher + ?Sized>(
    cipher: &C,
    secret_key: &[u8; 32],
    pubkey: &str,
    payload: &str,
) -> Result<String, Nip04Error> {
    let plaintext = cipher.decrypt(&shared_secret(secret_key, pubkey)?, payload)?;
    String::from_utf8(plaintext).map_err(|e| Nip04Error::Decryption(e.to_string()))
}

#[cfg(feature = "full")]
pub use aes_cbc::{Aes256CbcCipher, decrypt, encrypt};

#[cfg(feature = "full")]
mod aes_cbc {
    use aes::Aes256;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use cbc::cipher::block_padding::Pkcs7;
    use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

    use super::{Nip04Error, SymmetricCipher, decrypt_with, encrypt_with};

    type Encryptor = cbc::Encryptor<Aes256>;
    type Decryptor = cbc::Decryptor<Aes256>;

    const IV_SEPARATOR: &str = "?iv=";

    /// AES-256-CBC with PKCS#7 padding and a random 16-byte IV.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Aes256CbcCipher;

    impl SymmetricCipher for Aes256CbcCipher {
        fn encrypt(&self, shared_key: &[u8; 32], plaintext: &[u8]) -> Result<String, Nip04Error> {
            let iv: [u8; 16] = rand::random();
            let ciphertext = Encryptor::new_from_slices(shared_key, &iv)
                .map_err(|e| Nip04Error::InvalidKey(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
            Ok(format!(
                "{}{IV_SEPARATOR}{}",
                STANDARD.encode(ciphertext),
                STANDARD.encode(iv)
            ))
        }

        fn decrypt(&self, shared_key: &[u8; 32], payload: &str) -> Result<Vec<u8>, Nip04Error> {
            let (ciphertext, iv) = payload
                .split_once(IV_SEPARATOR)
                .filter(|(ct, iv)| !ct.is_empty() && !iv.is_empty())
                .ok_or_else(|| Nip04Error::InvalidPayload("expected <ciphertext>?iv=<iv>".into()))?;
            let ciphertext = STANDARD
                .decode(ciphertext)
                .map_err(|e| Nip04Error::InvalidPayload(e.to_string()))?;
            let iv = STANDARD
                .decode(iv)
                .map_err(|e| Nip04Error::InvalidPayload(e.to_string()))?;

            Decryptor::new_from_slices(shared_key, &iv)
                .map_err(|e| Nip04Error::InvalidPayload(e.to_string()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                .map_err(|e| Nip04Error::Decryption(e.to_string()))
        }
    }

    /// Encrypt `text` from `secret_key` to `pubkey`.
    pub fn encrypt(secret_key: &[u8; 32], pubkey: &str, text: &str) -> Result<String, Nip04Error> {
        encrypt_with(&Aes256CbcCipher, secret_key, pubkey, text)
    }

    /// Decrypt a payload sent to `secret_key` by `pubkey`.
    pub fn decrypt(secret_key: &[u8; 32], pubkey: &str, payload: &str) -> Result<String, Nip04Error> {
        decrypt_with(&Aes256CbcCipher, secret_key, pubkey, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_secret_key, get_public_key_hex};

    #[test]
    fn shared_secret_is_symmetric() {
        let sk1 = generate_secret_key();
        let sk2 = generate_secret_key();
        let pk1 = get_public_key_hex(&sk1).unwrap();
        let pk2 = get_public_key_hex(&sk2).unwrap();

        assert_eq!(
            shared_secret(&sk1, &pk2).unwrap(),
            shared_secret(&sk2, &pk1).unwrap()
        );
    }

    #[test]
    fn invalid_pubkey_is_rejected() {
        let sk = generate_secret_key();
        assert!(matches!(
            shared_secret(&sk, "abcd"),
            Err(Nip04Error::InvalidKey(_))
        ));
    }

    #[cfg(feature = "full")]
    #[test]
    fn encrypt_and_decrypt_message() {
        let sk1 = generate_secret_key();
        let sk2 = generate_secret_key();
        let pk1 = get_public_key_hex(&sk1).unwrap();
        let pk2 = get_public_key_hex(&sk2).unwrap();

        let payload = encrypt(&sk1, &pk2, "hello").unwrap();
        assert!(payload.contains("?iv="));
        assert_eq!(decrypt(&sk2, &pk1, &payload).unwrap(), "hello");
    }

    #[cfg(feature = "full")]
    #[test]
    fn wrong_key_or_malformed_payload_fails() {
        let sk1 = generate_secret_key();
        let sk2 = generate_secret_key();
        let sk3 = generate_secret_key();
        let pk2 = get_public_key_hex(&sk2).unwrap();
        let pk3 = get_public_key_hex(&sk3).unwrap();

        let payload = encrypt(&sk1, &pk2, "a secret long enough to span blocks").unwrap();
        let decrypted = decrypt(&sk3, &pk3, &payload);
        assert!(decrypted.map_or(true, |text| text != "a secret long enough to span blocks"));

        assert!(matches!(
            decrypt(&sk2, &pk3, "no-iv-here"),
            Err(Nip04Error::InvalidPayload(_))
        ));
        assert!(matches!(
            decrypt(&sk2, &pk3, "!!!?iv=AAAA"),
            Err(Nip04Error::InvalidPayload(_))
        ));
    }
}

//! NIP-06: keys from BIP-39 mnemonic seed phrases.

use std::str::FromStr;

use anyhow::{Context, Result};
use bip39::{Language, Mnemonic};
use bitcoin::Network;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::key::Secp256k1;

use crate::keys::Keypair;

const NOSTR_COIN_TYPE: u32 = 1237;

pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/1237'/0'/0/0";

/// Derive the secret key at `path` from a mnemonic and optional passphrase.
pub fn derive_private_key(words: &str, passphrase: Option<&str>, path: &str) -> Result<[u8; 32]> {
    let mnemonic = Mnemonic::parse(words.trim()).context("invalid mnemonic")?;
    let path = DerivationPath::from_str(path).context("invalid derivation path")?;
    derive_at(&mnemonic, passphrase.unwrap_or(""), &path)
}

/// Hex secret key at the default NIP-06 path.
pub fn private_key_from_seed_words(words: &str, passphrase: Option<&str>) -> Result<String> {
    derive_private_key(words, passphrase, DEFAULT_DERIVATION_PATH).map(hex::encode)
}

pub fn derive_keypair(mnemonic: &str) -> Result<Keypair> {
    derive_keypair_with_account(mnemonic, 0)
}

pub fn derive_keypair_with_account(mnemonic: &str, account: u32) -> Result<Keypair> {
    let parsed_mnemonic = Mnemonic::parse(mnemonic.trim()).context("invalid mnemonic")?;

    let path = DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(44).context("failed to derive purpose")?,
        ChildNumber::from_hardened_idx(NOSTR_COIN_TYPE).context("failed to derive coin type")?,
        ChildNumber::from_hardened_idx(account).context("failed to derive account")?,
        ChildNumber::from_normal_idx(0).context("failed to derive change")?,
        ChildNumber::from_normal_idx(0).context("failed to derive index")?,
    ]);

    let private_key = derive_at(&parsed_mnemonic, "", &path)?;
    Keypair::from_secret_key(&private_key).context("failed to create secp256k1 secret key")
}

/// A fresh 24-word English mnemonic (256 bits of entropy).
pub fn generate_seed_words() -> Result<String> {
    let entropy: [u8; 32] = rand::random();
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .context("failed to generate mnemonic")?;
    Ok(mnemonic.to_string())
}

/// Whether `words` is a valid English mnemonic, checksum included.
pub fn validate_words(words: &str) -> bool {
    Mnemonic::parse_in(Language::English, words.trim()).is_ok()
}

fn derive_at(mnemonic: &Mnemonic, passphrase: &str, path: &DerivationPath) -> Result<[u8; 32]> {
    let seed = mnemonic.to_seed(passphrase);

    let secp = Secp256k1::new();
    let master =
        Xpriv::new_master(Network::Bitcoin, &seed).context("failed to create master key")?;
    let derived = master
        .derive_priv(&secp, path)
        .context("failed to derive nostr private key")?;

    Ok(derived.private_key.secret_bytes())
}

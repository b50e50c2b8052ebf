//! # Bitwarden Crypto
//!
//! Symmetric keys and type-2 `EncString`s (AES-256-CBC + HMAC-SHA256).
//!
//! Wire format of an `EncString`:
//!
//! ```text
//! 2.<base64 iv>|<base64 ciphertext>|<base64 mac>
//! ```
//!
//! The MAC covers `iv || ciphertext` and is checked before decryption.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const ENC_TYPE_AES_CBC_256_HMAC_SHA256: &str = "2";
const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;

/// HMAC key used to turn an access token seed into a pseudo-random key
const ACCESS_TOKEN_PRK_KEY: &[u8] = b"bitwarden-accesstoken";
/// HKDF info used to expand the access token key
const ACCESS_TOKEN_INFO: &[u8] = b"sm-access-token";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid EncString: {0}")]
    InvalidEncString(&'static str),
    #[error("unsupported EncString type '{0}'")]
    UnsupportedEncType(String),
    #[error("invalid base64 in EncString")]
    InvalidBase64,
    #[error("invalid key length {0}, expected 64 bytes")]
    InvalidKeyLength(usize),
    #[error("MAC verification failed")]
    MacMismatch,
    #[error("decryption failed")]
    Decrypt,
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
    #[error("key derivation failed")]
    KeyDerivation,
}

/// 64-byte symmetric key: 32 bytes AES key followed by 32 bytes MAC key
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    enc_key: [u8; 32],
    mac_key: [u8; 32],
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(***)")
    }
}

impl SymmetricKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        let mut enc_key = [0u8; 32];
        let mut mac_key = [0u8; 32];
        enc_key.copy_from_slice(&bytes[..32]);
        mac_key.copy_from_slice(&bytes[32..]);
        Ok(Self { enc_key, mac_key })
    }

    /// Base64 encoded 64-byte key, as carried in `{"encryptionKey": ...}`
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| CryptoError::InvalidBase64)?,
        );
        Self::from_bytes(&bytes)
    }

    /// Derive the key protecting an access token's encrypted payload
    ///
    /// PRK = HMAC-SHA256("bitwarden-accesstoken", seed), then HKDF-SHA256
    /// expand with info "sm-access-token" to 64 bytes.
    pub fn derive_from_access_token_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let mut prk_mac =
            HmacSha256::new_from_slice(ACCESS_TOKEN_PRK_KEY).map_err(|_| CryptoError::KeyDerivation)?;
        prk_mac.update(seed);
        let mut prk = Zeroizing::new([0u8; 32]);
        prk.copy_from_slice(&prk_mac.finalize().into_bytes());

        let hkdf = Hkdf::<Sha256>::from_prk(&prk[..]).map_err(|_| CryptoError::KeyDerivation)?;
        let mut okm = Zeroizing::new([0u8; 64]);
        hkdf.expand(ACCESS_TOKEN_INFO, &mut okm[..])
            .map_err(|_| CryptoError::KeyDerivation)?;
        Self::from_bytes(&okm[..])
    }

    /// Fresh random key
    #[cfg(test)]
    #[must_use]
    pub(crate) fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 64]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        let mut enc_key = [0u8; 32];
        let mut mac_key = [0u8; 32];
        enc_key.copy_from_slice(&bytes[..32]);
        mac_key.copy_from_slice(&bytes[32..]);
        Self { enc_key, mac_key }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn to_base64(&self) -> String {
        let mut bytes = Zeroizing::new([0u8; 64]);
        bytes[..32].copy_from_slice(&self.enc_key);
        bytes[32..].copy_from_slice(&self.mac_key);
        STANDARD.encode(&bytes[..])
    }

    fn mac(&self, iv: &[u8], data: &[u8]) -> Result<HmacSha256, CryptoError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.mac_key).map_err(|_| CryptoError::KeyDerivation)?;
        mac.update(iv);
        mac.update(data);
        Ok(mac)
    }
}

/// Type-2 encrypted string
#[derive(Clone, PartialEq, Eq)]
pub struct EncString {
    iv: [u8; IV_LEN],
    data: Vec<u8>,
    mac: [u8; MAC_LEN],
}

impl fmt::Debug for EncString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncString")
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl EncString {
    /// Encrypt `plaintext` under `key` with a random IV
    pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<Self, CryptoError> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let data = Aes256CbcEnc::new_from_slices(&key.enc_key, &iv)
            .map_err(|_| CryptoError::KeyDerivation)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&key.mac(&iv, &data)?.finalize().into_bytes());

        Ok(Self { iv, data, mac })
    }

    /// Verify the MAC and decrypt
    pub fn decrypt(&self, key: &SymmetricKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        key.mac(&self.iv, &self.data)?
            .verify_slice(&self.mac)
            .map_err(|_| CryptoError::MacMismatch)?;

        Aes256CbcDec::new_from_slices(&key.enc_key, &self.iv)
            .map_err(|_| CryptoError::Decrypt)?
            .decrypt_padded_vec_mut::<Pkcs7>(&self.data)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decrypt)
    }

    pub fn decrypt_to_string(&self, key: &SymmetricKey) -> Result<String, CryptoError> {
        let bytes = self.decrypt(key)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CryptoError::InvalidUtf8)
    }
}

impl FromStr for EncString {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (enc_type, rest) = s
            .split_once('.')
            .ok_or(CryptoError::InvalidEncString("missing type prefix"))?;
        if enc_type != ENC_TYPE_AES_CBC_256_HMAC_SHA256 {
            return Err(CryptoError::UnsupportedEncType(enc_type.to_string()));
        }

        let mut parts = rest.split('|');
        let (Some(iv), Some(data), Some(mac), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidEncString("expected iv|data|mac"));
        };

        let decode = |part: &str| STANDARD.decode(part).map_err(|_| CryptoError::InvalidBase64);
        let iv: [u8; IV_LEN] = decode(iv)?
            .try_into()
            .map_err(|_| CryptoError::InvalidEncString("iv must be 16 bytes"))?;
        let mac: [u8; MAC_LEN] = decode(mac)?
            .try_into()
            .map_err(|_| CryptoError::InvalidEncString("mac must be 32 bytes"))?;
        let data = decode(data)?;
        if data.is_empty() {
            return Err(CryptoError::InvalidEncString("empty ciphertext"));
        }

        Ok(Self { iv, data, mac })
    }
}

impl fmt::Display for EncString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}|{}|{}",
            ENC_TYPE_AES_CBC_256_HMAC_SHA256,
            STANDARD.encode(self.iv),
            STANDARD.encode(&self.data),
            STANDARD.encode(self.mac)
        )
    }
}

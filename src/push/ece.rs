//! `aes128gcm` content encoding (RFC 8188) with the Web Push key
//! agreement of RFC 8291.
//!
//! Every call generates a fresh ephemeral P-256 key pair and a fresh salt.
//! The message is always a single record: plaintext, a `0x02` delimiter and
//! the 16-byte GCM tag.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use hkdf::Hkdf;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey, ecdh};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use crate::codec::concat;
use crate::error::PushError;

pub const SALT_LEN: usize = 16;
pub const AUTH_SECRET_LEN: usize = 16;
pub const PUBLIC_KEY_LEN: usize = 65;
const TAG_LEN: usize = 16;
const LAST_RECORD_DELIMITER: u8 = 0x02;
/// Largest plaintext that fits a 4096-byte push message in one record.
pub const MAX_PLAINTEXT_LEN: usize = 3993;

const WEBPUSH_INFO: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// One encrypted push body, split into the record header and the sealed
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    /// `salt || rs (u32 BE) || idlen || ephemeral public key`
    pub header: Vec<u8>,
    /// AES-128-GCM output, tag included.
    pub ciphertext: Vec<u8>,
}

impl EncryptedMessage {
    pub fn salt(&self) -> &[u8] {
        &self.header[..SALT_LEN]
    }

    pub fn record_size(&self) -> u32 {
        let mut rs = [0u8; 4];
        rs.copy_from_slice(&self.header[SALT_LEN..SALT_LEN + 4]);
        u32::from_be_bytes(rs)
    }

    pub fn server_public_key(&self) -> &[u8] {
        &self.header[SALT_LEN + 5..]
    }

    pub fn len(&self) -> usize {
        self.header.len() + self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wire body: header followed by ciphertext.
    pub fn to_body(&self) -> Vec<u8> {
        concat(&[&self.header, &self.ciphertext])
    }
}

pub fn encrypt(
    plaintext: &[u8],
    client_public_key: &[u8],
    client_auth_secret: &[u8],
) -> Result<EncryptedMessage, PushError> {
    let mut rng = OsRng;
    encrypt_with_rng(&mut rng, plaintext, client_public_key, client_auth_secret)
}

pub(crate) fn encrypt_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    plaintext: &[u8],
    client_public_key: &[u8],
    client_auth_secret: &[u8],
) -> Result<EncryptedMessage, PushError> {
    let server_secret = SecretKey::random(&mut *rng);
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    encrypt_with_keys(
        plaintext,
        client_public_key,
        client_auth_secret,
        &server_secret,
        salt,
    )
}

pub(crate) fn encrypt_with_keys(
    plaintext: &[u8],
    client_public_key: &[u8],
    client_auth_secret: &[u8],
    server_secret: &SecretKey,
    salt: [u8; SALT_LEN],
) -> Result<EncryptedMessage, PushError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(PushError::PayloadTooLarge {
            len: plaintext.len(),
            max: MAX_PLAINTEXT_LEN,
        });
    }
    let client_key = parse_client_public_key(client_public_key)?;
    if client_auth_secret.len() != AUTH_SECRET_LEN {
        return Err(PushError::InvalidKeyMaterial(format!(
            "auth secret must be {AUTH_SECRET_LEN} bytes, got {}",
            client_auth_secret.len()
        )));
    }

    let server_public = server_secret.public_key().to_encoded_point(false);
    let server_public = server_public.as_bytes();
    let shared = ecdh::diffie_hellman(server_secret.to_nonzero_scalar(), client_key.as_affine());

    let keys = derive_keys(
        shared.raw_secret_bytes(),
        client_auth_secret,
        client_public_key,
        server_public,
        &salt,
    )?;

    let padded = concat(&[plaintext, &[LAST_RECORD_DELIMITER]]);
    let cipher = Aes128Gcm::new_from_slice(&keys.cek)
        .map_err(|err| PushError::Encryption(err.to_string()))?;
    let ciphertext = cipher
        .encrypt(&Nonce::from(keys.nonce), padded.as_slice())
        .map_err(|_| PushError::Encryption("aes-128-gcm seal failed".to_string()))?;

    let record_size = (plaintext.len() + 1 + TAG_LEN) as u32;
    let header = concat(&[
        &salt,
        &record_size.to_be_bytes(),
        &[PUBLIC_KEY_LEN as u8],
        server_public,
    ]);

    Ok(EncryptedMessage { header, ciphertext })
}

fn parse_client_public_key(bytes: &[u8]) -> Result<PublicKey, PushError> {
    if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != 0x04 {
        return Err(PushError::InvalidKeyMaterial(format!(
            "subscriber key must be a {PUBLIC_KEY_LEN}-byte uncompressed P-256 point, got {} bytes",
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(bytes).map_err(|_| {
        PushError::InvalidKeyMaterial("subscriber key is not a point on P-256".to_string())
    })
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ContentKeys {
    pub(crate) ikm: [u8; 32],
    pub(crate) cek: [u8; 16],
    pub(crate) nonce: [u8; 12],
}

/// Key schedule shared by sender and receiver.
///
/// `ua_public` is the subscriber key, `as_public` the ephemeral sender key.
pub(crate) fn derive_keys(
    shared_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<ContentKeys, PushError> {
    let info = concat(&[WEBPUSH_INFO, ua_public, as_public]);
    let mut ikm = [0u8; 32];
    Hkdf::<Sha256>::new(Some(auth_secret), shared_secret)
        .expand(&info, &mut ikm)
        .map_err(|err| PushError::Encryption(err.to_string()))?;

    let content = Hkdf::<Sha256>::new(Some(salt), &ikm);
    let mut cek = [0u8; 16];
    content
        .expand(CEK_INFO, &mut cek)
        .map_err(|err| PushError::Encryption(err.to_string()))?;
    let mut nonce = [0u8; 12];
    content
        .expand(NONCE_INFO, &mut nonce)
        .map_err(|err| PushError::Encryption(err.to_string()))?;

    Ok(ContentKeys { ikm, cek, nonce })
}

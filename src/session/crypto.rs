use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

use super::SessionError;

/// Fixed application constant combined with the user password during
/// key derivation. It ships with the binary, so it adds no secrecy —
/// sealing is only as strong as the password. Round-trip correctness is
/// the guarantee that matters here.
const APP_KEY: &[u8] = b"pipelab/session-seal/v1";

const PBKDF2_ITERATIONS: u32 = 100_000;

fn derive_key(password: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    // Iteration count is a nonzero constant.
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).unwrap_or(NonZeroU32::MIN);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        APP_KEY,
        password.as_bytes(),
        &mut key,
    );
    key
}

fn aead_key(password: &str) -> Result<LessSafeKey, SessionError> {
    let unbound = UnboundKey::new(&AES_256_GCM, &derive_key(password))
        .map_err(|_| SessionError::Decryption)?;
    Ok(LessSafeKey::new(unbound))
}

/// Seal `plaintext` under a password-derived key.
///
/// Output layout: 12-byte random nonce followed by the
/// ciphertext-and-tag. The blob is opaque binary and will never parse
/// as JSON, which is how loaders detect a sealed session.
pub(crate) fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>, SessionError> {
    let key = aead_key(password)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| SessionError::Decryption)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| SessionError::Decryption)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);
    Ok(blob)
}

/// Open a sealed blob with the given password.
///
/// # Errors
///
/// [`SessionError::Decryption`] for a wrong password, a truncated
/// blob, or any tampering — the caller should re-prompt, and must not
/// overwrite the on-disk file.
pub(crate) fn open(blob: &[u8], password: &str) -> Result<Vec<u8>, SessionError> {
    if blob.len() <= NONCE_LEN {
        return Err(SessionError::Decryption);
    }
    let key = aead_key(password)?;

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let mut nonce_array = [0u8; NONCE_LEN];
    nonce_array.copy_from_slice(nonce_bytes);
    let nonce = Nonce::assume_unique_for_key(nonce_array);

    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| SessionError::Decryption)?;
    Ok(plaintext.to_vec())
}

// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Symmetric cipher lane: AES-256-CBC with PKCS#7 padding.
//!
//! The 32-byte key is derived from the passphrase and salt with
//! PBKDF2-HMAC-SHA1. The IV is the first 16 bytes of the salt, which keeps
//! existing savegames readable but ties IV freshness to salt freshness: never
//! reuse a salt.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use keepsake_core::lane::{Lane, LaneKind};
use keepsake_core::{Result, SavegameError};
use parking_lot::{Mutex, MutexGuard};
use sha1::Sha1;
use zeroize::{Zeroize, Zeroizing};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Longest accepted salt, bounding key-derivation cost.
pub const MAX_SALT_LEN: usize = 256;
/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// IV length in bytes; also the shortest accepted salt.
pub const IV_LEN: usize = 16;
/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Shared IV scratch buffer, zeroed when the guard goes out of scope.
struct IvScratch<'a>(MutexGuard<'a, [u8; IV_LEN]>);

impl Drop for IvScratch<'_> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Encrypts and decrypts savegame bytes with a passphrase.
///
/// One call at a time holds the IV scratch buffer; concurrent callers wait.
#[derive(Debug, Default)]
pub struct CipherLane {
    iv_scratch: Mutex<[u8; IV_LEN]>,
}

impl CipherLane {
    /// Creates a new cipher lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypts `plaintext`. Empty input returns empty output.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>> {
        if plaintext.is_empty() {
            return Ok(Vec::new());
        }
        validate(key, salt, iterations)?;
        let iv = self.load_iv(salt);
        let derived = derive_key(key, salt, iterations);
        let cipher = Aes256CbcEnc::new_from_slices(derived.as_slice(), iv.0.as_slice())
            .map_err(|e| SavegameError::config(format!("invalid cipher parameters: {e}")))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    /// Decrypts `ciphertext`. Empty input returns empty output.
    ///
    /// A wrong key, a wrong salt or corrupted bytes surface as
    /// [`SavegameError::Decryption`].
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>> {
        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        validate(key, salt, iterations)?;
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(SavegameError::decryption(format!(
                "ciphertext length {} is not a multiple of the block size",
                ciphertext.len()
            )));
        }
        let iv = self.load_iv(salt);
        let derived = derive_key(key, salt, iterations);
        let cipher = Aes256CbcDec::new_from_slices(derived.as_slice(), iv.0.as_slice())
            .map_err(|e| SavegameError::config(format!("invalid cipher parameters: {e}")))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| SavegameError::decryption("invalid padding (wrong key or salt?)"))
    }

    fn load_iv(&self, salt: &[u8]) -> IvScratch<'_> {
        let mut scratch = IvScratch(self.iv_scratch.lock());
        scratch.0.copy_from_slice(&salt[..IV_LEN]);
        scratch
    }
}

impl Lane for CipherLane {
    fn strategy_name(&self) -> &'static str {
        "KS_AES256_CBC_PBKDF2_SHA1"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Cipher
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

fn validate(key: &str, salt: &[u8], iterations: u32) -> Result<()> {
    if key.is_empty() {
        return Err(SavegameError::config("encryption key is empty"));
    }
    if salt.len() > MAX_SALT_LEN {
        return Err(SavegameError::config(format!(
            "salt of {} bytes exceeds the {MAX_SALT_LEN} byte maximum",
            salt.len()
        )));
    }
    if salt.len() < IV_LEN {
        return Err(SavegameError::config(format!(
            "salt of {} bytes is shorter than the {IV_LEN} byte IV",
            salt.len()
        )));
    }
    if iterations == 0 {
        return Err(SavegameError::config("key derivation needs at least one iteration"));
    }
    Ok(())
}

fn derive_key(key: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut derived = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha1>(key.as_bytes(), salt, iterations, derived.as_mut_slice());
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "correct horse";
    const SALT: &[u8] = b"keepsake-test-salt-0123456789abcdef";
    const PLAINTEXT: &[u8] = br#"{"health":42,"position":[1.0,2.0,3.0]}"#;

    #[test]
    fn round_trip() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(PLAINTEXT, KEY, SALT, 32).unwrap();
        assert_eq!(ciphertext.len(), 48);
        assert_ne!(&ciphertext[..PLAINTEXT.len().min(48)], &PLAINTEXT[..]);
        assert_eq!(lane.decrypt(&ciphertext, KEY, SALT, 32).unwrap(), PLAINTEXT);
    }

    #[test]
    fn block_aligned_input_gets_a_full_padding_block() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(&[7u8; 32], KEY, SALT, 1).unwrap();
        assert_eq!(ciphertext.len(), 48);
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let lane = CipherLane::new();
        assert!(lane.encrypt(&[], KEY, SALT, 32).unwrap().is_empty());
        assert!(lane.decrypt(&[], KEY, SALT, 32).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_is_a_decryption_error() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(PLAINTEXT, KEY, SALT, 32).unwrap();
        let result = lane.decrypt(&ciphertext, "battery staple", SALT, 32);
        assert!(matches!(result, Err(SavegameError::Decryption(_))));
    }

    #[test]
    fn wrong_salt_is_a_decryption_error() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(PLAINTEXT, KEY, SALT, 32).unwrap();
        let result = lane.decrypt(&ciphertext, KEY, b"another-salt-value-0123456789abcd", 32);
        assert!(matches!(result, Err(SavegameError::Decryption(_))));
    }

    #[test]
    fn wrong_iteration_count_is_a_decryption_error() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(PLAINTEXT, KEY, SALT, 32).unwrap();
        let result = lane.decrypt(&ciphertext, KEY, SALT, 33);
        assert!(matches!(result, Err(SavegameError::Decryption(_))));
    }

    #[test]
    fn truncated_ciphertext_is_a_decryption_error() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(PLAINTEXT, KEY, SALT, 32).unwrap();
        let result = lane.decrypt(&ciphertext[..ciphertext.len() - 3], KEY, SALT, 32);
        assert!(matches!(result, Err(SavegameError::Decryption(_))));
    }

    #[test]
    fn salt_bounds_are_configuration_errors() {
        let lane = CipherLane::new();
        let oversized = vec![1u8; MAX_SALT_LEN + 1];
        assert!(matches!(
            lane.encrypt(PLAINTEXT, KEY, &oversized, 32),
            Err(SavegameError::Configuration(_))
        ));
        assert!(matches!(
            lane.encrypt(PLAINTEXT, KEY, b"short", 32),
            Err(SavegameError::Configuration(_))
        ));
        assert!(lane
            .encrypt(PLAINTEXT, KEY, &vec![1u8; MAX_SALT_LEN], 32)
            .is_ok());
    }

    #[test]
    fn empty_key_and_zero_iterations_are_rejected() {
        let lane = CipherLane::new();
        assert!(matches!(
            lane.encrypt(PLAINTEXT, "", SALT, 32),
            Err(SavegameError::Configuration(_))
        ));
        assert!(matches!(
            lane.decrypt(&[0u8; 16], KEY, SALT, 0),
            Err(SavegameError::Configuration(_))
        ));
    }

    #[test]
    fn iv_scratch_is_zeroed_after_success_and_failure() {
        let lane = CipherLane::new();
        let ciphertext = lane.encrypt(PLAINTEXT, KEY, SALT, 32).unwrap();
        assert_eq!(*lane.iv_scratch.lock(), [0u8; IV_LEN]);

        let _ = lane.decrypt(&ciphertext, "battery staple", SALT, 32);
        assert_eq!(*lane.iv_scratch.lock(), [0u8; IV_LEN]);
    }
}

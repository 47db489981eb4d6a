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

//! The savegame byte pipeline.
//!
//! Save: codec, then optional gzip, then optional encryption with a fresh
//! 64-byte salt prepended to the ciphertext. Load runs the steps in reverse.
//!
//! The salt stored in the file is raw random bytes; the key derivation is fed
//! its standard base64 text, and the IV is the first 16 bytes of that text.
//! Files written by earlier releases of the savegame format use the same
//! convention and stay readable.

use crate::cipher_lane::CipherLane;
use crate::codec_lane::{codec_for, ContainerCodec};
use crate::compression_lane::GzipLane;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keepsake_core::format::SALT_LEN;
use keepsake_core::lane::Lane;
use keepsake_core::{CodecKind, Container, Result, SavegameConfig, SavegameError};
use rand::rngs::OsRng;
use rand::RngCore;
use std::borrow::Cow;
use std::io::{Read, Write};
use zeroize::Zeroizing;

/// Everything the pipeline needs from the deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Container codec.
    pub codec: CodecKind,
    /// Indent the encoded container.
    pub pretty: bool,
    /// Gzip the encoded container.
    pub compress: bool,
    /// Encrypt with this passphrase.
    pub key: Option<String>,
    /// Encrypt at all.
    pub encrypt: bool,
    /// PBKDF2 rounds.
    pub iterations: u32,
    /// Cap on decompressed size.
    pub max_decompressed_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&SavegameConfig::default())
    }
}

impl From<&SavegameConfig> for PipelineOptions {
    fn from(config: &SavegameConfig) -> Self {
        Self {
            codec: config.codec,
            pretty: config.pretty_print,
            compress: config.compress,
            key: config.key.clone(),
            encrypt: config.encrypt,
            iterations: config.pbkdf2_iterations,
            max_decompressed_bytes: config.max_decompressed_bytes,
        }
    }
}

struct Encryption {
    key: Zeroizing<String>,
    iterations: u32,
}

/// Codec, compressor and cipher lanes chained in file order.
pub struct SavegamePipeline {
    codec: Box<dyn ContainerCodec>,
    pretty: bool,
    compressor: Option<GzipLane>,
    cipher: CipherLane,
    encryption: Option<Encryption>,
}

impl SavegamePipeline {
    /// Builds the pipeline described by `options`.
    pub fn new(options: PipelineOptions) -> Result<Self> {
        let encryption = if options.encrypt {
            let key = options
                .key
                .filter(|k| !k.is_empty())
                .ok_or_else(|| SavegameError::config("encryption is enabled but no key is set"))?;
            if options.iterations == 0 {
                return Err(SavegameError::config(
                    "key derivation needs at least one iteration",
                ));
            }
            Some(Encryption {
                key: Zeroizing::new(key),
                iterations: options.iterations,
            })
        } else {
            None
        };

        let pipeline = Self {
            codec: codec_for(options.codec),
            pretty: options.pretty,
            compressor: options
                .compress
                .then(|| GzipLane::with_limit(options.max_decompressed_bytes)),
            cipher: CipherLane::new(),
            encryption,
        };
        log::debug!("Savegame pipeline: {}.", pipeline.describe());
        Ok(pipeline)
    }

    /// Builds the pipeline for a deployment configuration.
    pub fn from_config(config: &SavegameConfig) -> Result<Self> {
        Self::new(PipelineOptions::from(config))
    }

    /// Lane names in save order, e.g. `KS_JSON_V1 -> KS_GZIP`.
    pub fn describe(&self) -> String {
        let mut lanes = vec![self.codec.strategy_name()];
        if let Some(compressor) = &self.compressor {
            lanes.push(compressor.strategy_name());
        }
        if self.encryption.is_some() {
            lanes.push(self.cipher.strategy_name());
        }
        lanes.join(" -> ")
    }

    /// The codec lane in use.
    pub fn codec(&self) -> &dyn ContainerCodec {
        self.codec.as_ref()
    }

    /// Turns a container into savegame file bytes.
    pub fn encode(&self, container: &Container) -> Result<Vec<u8>> {
        let mut bytes = self.codec.encode(container, self.pretty)?;
        if let Some(compressor) = &self.compressor {
            bytes = compressor.compress(&bytes)?;
        }
        if let Some(encryption) = &self.encryption {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            let kdf_salt = Zeroizing::new(BASE64.encode(salt));

            let ciphertext = self.cipher.encrypt(
                &bytes,
                &encryption.key,
                kdf_salt.as_bytes(),
                encryption.iterations,
            )?;
            let mut framed = Vec::with_capacity(SALT_LEN + ciphertext.len());
            framed.extend_from_slice(&salt);
            framed.extend_from_slice(&ciphertext);
            bytes = framed;
        }
        Ok(bytes)
    }

    /// Turns savegame file bytes back into a container.
    pub fn decode(&self, bytes: &[u8]) -> Result<Container> {
        let mut current = Cow::Borrowed(bytes);

        if let Some(encryption) = &self.encryption {
            if current.len() < SALT_LEN {
                return Err(SavegameError::decryption(format!(
                    "savegame of {} bytes is too short to hold its {SALT_LEN}-byte salt",
                    current.len()
                )));
            }
            let (salt, ciphertext) = current.split_at(SALT_LEN);
            let kdf_salt = Zeroizing::new(BASE64.encode(salt));
            let plain = self.cipher.decrypt(
                ciphertext,
                &encryption.key,
                kdf_salt.as_bytes(),
                encryption.iterations,
            )?;
            current = Cow::Owned(plain);
        }

        if let Some(compressor) = &self.compressor {
            current = Cow::Owned(compressor.decompress(&current)?);
        }

        self.codec.decode(&current)
    }

    /// Encodes `container` into `writer`.
    pub fn write_to<W: Write>(&self, container: &Container, mut writer: W) -> Result<()> {
        let bytes = self.encode(container)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads `reader` to the end and decodes it.
    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<Container> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::{PersistentId, SceneIdentity, Snapshot};

    fn sample() -> Container {
        let mut container = Container::new(SceneIdentity::new(4, "Depot"));
        for id in [3, 1, 2] {
            container.push_entity(PersistentId(id), Snapshot::new(format!("state-{id}")));
        }
        container.push_spawned("grenade", Some(Snapshot::new("fuse=2")));
        container
    }

    fn options(codec: CodecKind, compress: bool, encrypt: bool) -> PipelineOptions {
        PipelineOptions {
            codec,
            compress,
            encrypt,
            key: encrypt.then(|| "s3cret".to_string()),
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn every_combination_round_trips() {
        let container = sample();
        for codec in [CodecKind::Json, CodecKind::Xml] {
            for compress in [false, true] {
                for encrypt in [false, true] {
                    let pipeline = SavegamePipeline::new(options(codec, compress, encrypt)).unwrap();
                    let bytes = pipeline.encode(&container).unwrap();
                    assert_eq!(
                        pipeline.decode(&bytes).unwrap(),
                        container,
                        "{}",
                        pipeline.describe()
                    );
                }
            }
        }
    }

    #[test]
    fn plain_output_is_the_bare_codec_output() {
        let container = sample();
        let pipeline = SavegamePipeline::new(options(CodecKind::Json, false, false)).unwrap();
        let expected = pipeline.codec().encode(&container, false).unwrap();
        assert_eq!(pipeline.encode(&container).unwrap(), expected);
    }

    #[test]
    fn encrypted_output_is_salt_then_whole_blocks() {
        let pipeline = SavegamePipeline::new(options(CodecKind::Json, true, true)).unwrap();
        let first = pipeline.encode(&sample()).unwrap();
        let second = pipeline.encode(&sample()).unwrap();

        assert!(first.len() > SALT_LEN);
        assert_eq!((first.len() - SALT_LEN) % 16, 0);
        assert_ne!(&first[..SALT_LEN], &second[..SALT_LEN], "salt must be fresh per save");
    }

    #[test]
    fn wrong_key_never_yields_a_container() {
        let writer = SavegamePipeline::new(options(CodecKind::Json, false, true)).unwrap();
        let bytes = writer.encode(&sample()).unwrap();

        let reader = SavegamePipeline::new(PipelineOptions {
            key: Some("not the key".into()),
            ..options(CodecKind::Json, false, true)
        })
        .unwrap();
        let err = reader.decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            SavegameError::Decryption(_) | SavegameError::Decode(_)
        ));
    }

    #[test]
    fn truncated_encrypted_file_is_a_decryption_error() {
        let pipeline = SavegamePipeline::new(options(CodecKind::Json, false, true)).unwrap();
        assert!(matches!(
            pipeline.decode(&[0u8; 10]),
            Err(SavegameError::Decryption(_))
        ));
    }

    #[test]
    fn encryption_without_key_is_a_configuration_error() {
        let result = SavegamePipeline::new(PipelineOptions {
            encrypt: true,
            key: None,
            ..PipelineOptions::default()
        });
        assert!(matches!(result, Err(SavegameError::Configuration(_))));
    }

    #[test]
    fn streams_use_the_file_layout() {
        let pipeline = SavegamePipeline::new(options(CodecKind::Xml, true, false)).unwrap();
        let mut buffer = Vec::new();
        pipeline.write_to(&sample(), &mut buffer).unwrap();
        assert_eq!(&buffer[..2], &[0x1f, 0x8b]);
        assert_eq!(pipeline.read_from(buffer.as_slice()).unwrap(), sample());
    }

    #[test]
    fn describe_lists_active_lanes() {
        let pipeline = SavegamePipeline::new(options(CodecKind::Json, true, true)).unwrap();
        assert_eq!(
            pipeline.describe(),
            "KS_JSON_V1 -> KS_GZIP -> KS_AES256_CBC_PBKDF2_SHA1"
        );
    }
}

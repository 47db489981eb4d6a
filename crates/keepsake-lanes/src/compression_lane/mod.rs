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

//! Gzip compression lane.

use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use keepsake_core::lane::{Lane, LaneKind};
use keepsake_core::{Result, SavegameError};
use std::io::Read;

/// Default cap on decompressed output, guarding against decompression bombs.
pub const DEFAULT_MAX_DECOMPRESSED: usize = 256 * 1024 * 1024;

/// Compresses savegame bytes with gzip.
///
/// Empty input maps to empty output in both directions, so an empty buffer
/// never grows a gzip header.
#[derive(Debug, Clone)]
pub struct GzipLane {
    level: Compression,
    max_decompressed: usize,
}

impl GzipLane {
    /// Creates a lane with the default level and output cap.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_DECOMPRESSED)
    }

    /// Creates a lane refusing to inflate past `max_decompressed` bytes.
    pub fn with_limit(max_decompressed: usize) -> Self {
        Self {
            level: Compression::default(),
            max_decompressed,
        }
    }

    /// Compresses `data`.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut encoder = GzEncoder::new(data, self.level);
        let mut compressed = Vec::with_capacity(data.len() / 2);
        encoder
            .read_to_end(&mut compressed)
            .map_err(|e| SavegameError::encode(format!("compression failed: {e}")))?;
        Ok(compressed)
    }

    /// Inflates `data`.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut decoder = GzDecoder::new(data).take((self.max_decompressed as u64).saturating_add(1));
        let mut decompressed = Vec::with_capacity(data.len().saturating_mul(4));
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SavegameError::decode(format!("decompression failed: {e}")))?;

        if decompressed.len() > self.max_decompressed {
            return Err(SavegameError::decode(format!(
                "decompressed savegame exceeds {} bytes",
                self.max_decompressed
            )));
        }
        Ok(decompressed)
    }
}

impl Default for GzipLane {
    fn default() -> Self {
        Self::new()
    }
}

impl Lane for GzipLane {
    fn strategy_name(&self) -> &'static str {
        "KS_GZIP"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Compression
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_maps_to_empty() {
        let lane = GzipLane::new();
        assert!(lane.compress(&[]).unwrap().is_empty());
        assert!(lane.decompress(&[]).unwrap().is_empty());
    }

    #[test]
    fn single_byte_round_trip() {
        let lane = GzipLane::new();
        let compressed = lane.compress(&[0x2a]).unwrap();
        assert_eq!(lane.decompress(&compressed).unwrap(), vec![0x2a]);
    }

    #[test]
    fn one_megabyte_of_repeated_bytes_round_trips_and_shrinks() {
        let lane = GzipLane::new();
        let data = vec![b'k'; 1024 * 1024];
        let compressed = lane.compress(&data).unwrap();
        assert!(compressed.len() < data.len() / 100);
        assert_eq!(lane.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn output_starts_with_the_gzip_magic() {
        let compressed = GzipLane::new().compress(b"savegame").unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn corrupt_input_is_a_decode_error() {
        let result = GzipLane::new().decompress(b"definitely not gzip");
        assert!(matches!(result, Err(SavegameError::Decode(_))));
    }

    #[test]
    fn output_cap_is_enforced() {
        let data = vec![0u8; 10_000];
        let compressed = GzipLane::new().compress(&data).unwrap();

        let capped = GzipLane::with_limit(9_999);
        assert!(matches!(
            capped.decompress(&compressed),
            Err(SavegameError::Decode(_))
        ));
        assert_eq!(GzipLane::with_limit(10_000).decompress(&compressed).unwrap(), data);
    }
}

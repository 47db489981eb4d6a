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

//! Defines the abstract contract for container codecs.
//!
//! The core of this module is the [`ContainerCodec`] trait, which provides a
//! unified interface for every codec `Lane`. The pipeline holds one codec
//! polymorphically, chosen from the deployment's [`CodecKind`].

mod json_lane;
mod xml_lane;

pub use json_lane::JsonCodecLane;
pub use xml_lane::XmlCodecLane;

use keepsake_core::lane::Lane;
use keepsake_core::{CodecKind, Container, Result};

/// The abstract contract for a container codec `Lane`.
///
/// Each implementation maps a [`Container`] to one textual schema. Payloads
/// are stored verbatim; codecs never look inside a snapshot.
pub trait ContainerCodec: Lane {
    /// Encodes a container.
    ///
    /// # Arguments
    /// * `container` - The document to encode.
    /// * `pretty` - Indent the output for human readers.
    fn encode(&self, container: &Container, pretty: bool) -> Result<Vec<u8>>;

    /// Decodes a container.
    ///
    /// Missing optional fields fall back to their neutral values; malformed
    /// or missing required structure is a `SavegameError::Decode`.
    fn decode(&self, bytes: &[u8]) -> Result<Container>;
}

/// Builds the codec lane for `kind`.
pub fn codec_for(kind: CodecKind) -> Box<dyn ContainerCodec> {
    match kind {
        CodecKind::Json => Box::new(JsonCodecLane::new()),
        CodecKind::Xml => Box::new(XmlCodecLane::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::lane::LaneKind;

    #[test]
    fn codec_for_picks_the_matching_lane() {
        let json = codec_for(CodecKind::Json);
        let xml = codec_for(CodecKind::Xml);
        assert_eq!(json.strategy_name(), "KS_JSON_V1");
        assert_eq!(xml.strategy_name(), "KS_XML_V1");
        assert_eq!(json.lane_kind(), LaneKind::Codec);
        assert!(xml.as_any().downcast_ref::<XmlCodecLane>().is_some());
    }
}

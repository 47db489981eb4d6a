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

//! # Keepsake Lanes
//!
//! Hot-path byte pipelines of the savegame system.
//!
//! - [`codec_lane`]: container to bytes, as JSON or XML.
//! - [`compression_lane`]: gzip.
//! - [`cipher_lane`]: AES-256-CBC keyed through PBKDF2.
//! - [`pipeline`]: chains the three in file order.

#![warn(missing_docs)]

pub mod cipher_lane;
pub mod codec_lane;
pub mod compression_lane;
pub mod pipeline;

pub use cipher_lane::CipherLane;
pub use codec_lane::{codec_for, ContainerCodec, JsonCodecLane, XmlCodecLane};
pub use compression_lane::GzipLane;
pub use pipeline::{PipelineOptions, SavegamePipeline};

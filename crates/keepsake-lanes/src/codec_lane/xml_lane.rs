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

//! A codec lane that stores the container as an XML tree.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <savegame version="1">
//!   <map index="3" name="Harbor">
//!     <components>
//!       <component id="1">payload</component>
//!     </components>
//!     <prefabs>
//!       <prefab>
//!         <path>grenade</path>
//!         <component>payload</component>
//!       </prefab>
//!     </prefabs>
//!   </map>
//! </savegame>
//! ```
//!
//! Payloads are stored as escaped text content, byte for byte. A spawned
//! record without a snapshot has no `<component>` child.

use crate::codec_lane::ContainerCodec;
use keepsake_core::container::{
    SceneIdentity, CONTAINER_FORMAT_VERSION, PLACEHOLDER_SCENE_NAME, UNSET_SCENE_INDEX,
};
use keepsake_core::lane::{Lane, LaneKind};
use keepsake_core::{Container, PersistentId, Result, SavegameError, Snapshot};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::str::FromStr;

/// Stores the container as XML.
#[derive(Debug, Default)]
pub struct XmlCodecLane;

impl XmlCodecLane {
    /// Creates a new instance of the XmlCodecLane.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for XmlCodecLane {
    fn strategy_name(&self) -> &'static str {
        "KS_XML_V1"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Codec
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl ContainerCodec for XmlCodecLane {
    fn encode(&self, container: &Container, pretty: bool) -> Result<Vec<u8>> {
        let mut out = XmlOut {
            writer: if pretty {
                Writer::new_with_indent(Vec::new(), b' ', 2)
            } else {
                Writer::new(Vec::new())
            },
        };

        out.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let version = CONTAINER_FORMAT_VERSION.to_string();
        out.open("savegame", &[("version", &version)])?;

        let index = container.scene.index.to_string();
        out.open("map", &[("index", &index), ("name", &container.scene.name)])?;

        out.open("components", &[])?;
        for record in &container.entities {
            let id = record.id.to_string();
            out.text_element("component", &[("id", &id)], record.data.as_str())?;
        }
        out.close("components")?;

        out.open("prefabs", &[])?;
        for record in &container.spawned {
            out.open("prefab", &[])?;
            out.text_element("path", &[], &record.template_reference)?;
            if let Some(data) = &record.data {
                out.text_element("component", &[], data.as_str())?;
            }
            out.close("prefab")?;
        }
        out.close("prefabs")?;

        out.close("map")?;
        out.close("savegame")?;
        Ok(out.writer.into_inner())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Container> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SavegameError::decode(format!("XML savegame is not UTF-8: {e}")))?;
        let mut xml = XmlIn::new(text);

        let root = match xml.next_node()? {
            Node::Start(e) if e.name().as_ref() == b"savegame" => e,
            Node::Start(e) => {
                return Err(SavegameError::decode(format!(
                    "unexpected root element <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                )))
            }
            Node::End | Node::Eof => {
                return Err(SavegameError::decode("missing <savegame> root element"))
            }
        };

        let version: u32 = parse_attribute(&root, "version")?.unwrap_or(1);
        if version > CONTAINER_FORMAT_VERSION {
            return Err(SavegameError::decode(format!(
                "savegame format version {version} is newer than supported version {CONTAINER_FORMAT_VERSION}"
            )));
        }

        let mut container = Container::default();
        loop {
            match xml.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"map" => {
                    container.scene = SceneIdentity::new(
                        parse_attribute(&e, "index")?.unwrap_or(UNSET_SCENE_INDEX),
                        attribute(&e, "name")?
                            .unwrap_or_else(|| PLACEHOLDER_SCENE_NAME.to_string()),
                    );
                    xml.read_map(&mut container)?;
                }
                Node::Start(e) => xml.skip(&e)?,
                Node::End => break,
                Node::Eof => return Err(SavegameError::decode("unterminated <savegame>")),
            }
        }

        container.validate()?;
        Ok(container)
    }
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(SavegameError::encode)
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for &attribute in attributes {
            start.push_attribute(attribute);
        }
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    // Start, text, end with no indentation inside, even for empty text.
    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.open(name, attributes)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }
}

enum Node<'i> {
    Start(BytesStart<'i>),
    End,
    Eof,
}

struct XmlIn<'i> {
    reader: Reader<&'i [u8]>,
}

impl<'i> XmlIn<'i> {
    fn new(text: &'i str) -> Self {
        let mut reader = Reader::from_str(text);
        reader.config_mut().expand_empty_elements = true;
        Self { reader }
    }

    fn next(&mut self) -> Result<Event<'i>> {
        let position = self.reader.buffer_position();
        self.reader
            .read_event()
            .map_err(|e| SavegameError::decode(format!("malformed XML near byte {position}: {e}")))
    }

    /// Next element boundary, skipping the prolog, comments and layout whitespace.
    fn next_node(&mut self) -> Result<Node<'i>> {
        loop {
            match self.next()? {
                Event::Start(e) => return Ok(Node::Start(e)),
                Event::End(_) => return Ok(Node::End),
                Event::Eof => return Ok(Node::Eof),
                Event::Text(t) => {
                    let text = t.unescape().map_err(SavegameError::decode)?;
                    if !text.trim().is_empty() {
                        return Err(SavegameError::decode(format!(
                            "unexpected text '{}' between elements",
                            text.trim()
                        )));
                    }
                }
                Event::CData(_) => {
                    return Err(SavegameError::decode("unexpected CDATA between elements"))
                }
                _ => {}
            }
        }
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> Result<()> {
        log::debug!(
            "Skipping unknown savegame element <{}>.",
            String::from_utf8_lossy(start.name().as_ref())
        );
        self.reader
            .read_to_end(start.name())
            .map_err(SavegameError::decode)?;
        Ok(())
    }

    /// Collects the text content of the element that was just opened.
    fn text_content(&mut self) -> Result<String> {
        let mut content = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => content.push_str(&t.unescape().map_err(SavegameError::decode)?),
                Event::CData(c) => content.push_str(
                    std::str::from_utf8(&c).map_err(SavegameError::decode)?,
                ),
                Event::End(_) => return Ok(content),
                Event::Start(e) => {
                    return Err(SavegameError::decode(format!(
                        "unexpected element <{}> inside a text field",
                        String::from_utf8_lossy(e.name().as_ref())
                    )))
                }
                Event::Eof => return Err(SavegameError::decode("unterminated text field")),
                _ => {}
            }
        }
    }

    fn read_map(&mut self, container: &mut Container) -> Result<()> {
        loop {
            match self.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"components" => {
                    self.read_components(container)?
                }
                Node::Start(e) if e.name().as_ref() == b"prefabs" => self.read_prefabs(container)?,
                Node::Start(e) => self.skip(&e)?,
                Node::End => return Ok(()),
                Node::Eof => return Err(SavegameError::decode("unterminated <map>")),
            }
        }
    }

    fn read_components(&mut self, container: &mut Container) -> Result<()> {
        loop {
            match self.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"component" => {
                    let id: i32 = parse_attribute(&e, "id")?.ok_or_else(|| {
                        SavegameError::decode("<component> is missing its id attribute")
                    })?;
                    let data = self.text_content()?;
                    container.push_entity(PersistentId(id), Snapshot::new(data));
                }
                Node::Start(e) => self.skip(&e)?,
                Node::End => return Ok(()),
                Node::Eof => return Err(SavegameError::decode("unterminated <components>")),
            }
        }
    }

    fn read_prefabs(&mut self, container: &mut Container) -> Result<()> {
        loop {
            match self.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"prefab" => self.read_prefab(container)?,
                Node::Start(e) => self.skip(&e)?,
                Node::End => return Ok(()),
                Node::Eof => return Err(SavegameError::decode("unterminated <prefabs>")),
            }
        }
    }

    fn read_prefab(&mut self, container: &mut Container) -> Result<()> {
        let mut path = None;
        let mut data = None;
        loop {
            match self.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"path" => path = Some(self.text_content()?),
                Node::Start(e) if e.name().as_ref() == b"component" => {
                    data = Some(Snapshot::new(self.text_content()?))
                }
                Node::Start(e) => self.skip(&e)?,
                Node::End => break,
                Node::Eof => return Err(SavegameError::decode("unterminated <prefab>")),
            }
        }
        let path = path.ok_or_else(|| SavegameError::decode("<prefab> is missing its <path>"))?;
        container.push_spawned(path, data);
        Ok(())
    }
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let Some(attr) = start
        .try_get_attribute(name)
        .map_err(SavegameError::decode)?
    else {
        return Ok(None);
    };
    let value = attr.unescape_value().map_err(SavegameError::decode)?;
    Ok(Some(value.into_owned()))
}

fn parse_attribute<T: FromStr>(start: &BytesStart<'_>, name: &str) -> Result<Option<T>> {
    match attribute(start, name)? {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            SavegameError::decode(format!("attribute {name}=\"{raw}\" is not a valid number"))
        }),
        None => Ok(None),
    }
}

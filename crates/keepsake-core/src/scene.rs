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

//! Interfaces the savegame system consumes from the host world.

use crate::container::SceneIdentity;
use crate::error::Result;
use crate::id::EntityKey;
use crate::saveable::Saveable;
use std::collections::HashMap;
use std::fmt;

/// Where a scene transition should go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneTarget {
    /// By build index.
    Index(i32),
    /// By scene name.
    Name(String),
}

impl SceneTarget {
    /// Returns `true` when `scene` is the scene this target designates.
    pub fn matches(&self, scene: &SceneIdentity) -> bool {
        match self {
            SceneTarget::Index(index) => scene.index == *index,
            SceneTarget::Name(name) => scene.name == *name,
        }
    }
}

impl fmt::Display for SceneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneTarget::Index(index) => write!(f, "scene #{index}"),
            SceneTarget::Name(name) => write!(f, "scene '{name}'"),
        }
    }
}

/// The host's scene management service.
pub trait SceneHost {
    /// Identity of the currently active scene.
    fn active_scene(&self) -> SceneIdentity;

    /// Starts loading `target`.
    ///
    /// Completion is signalled back by calling
    /// `SavegameAgent::on_scene_loaded` on the agent of the new scene.
    fn load_scene(&mut self, target: &SceneTarget) -> Result<()>;

    /// Removes an entity from the world.
    fn destroy_entity(&mut self, key: EntityKey);
}

/// A freshly instantiated entity.
pub struct TemplateInstance {
    /// The new world entity.
    pub key: EntityKey,
    /// Its saveable state, if the template carries one.
    pub state: Option<Box<dyn Saveable>>,
}

/// Something that can create a new entity in the world.
pub trait Template {
    /// Creates one entity.
    fn instantiate(&self) -> Result<TemplateInstance>;
}

impl<F> Template for F
where
    F: Fn() -> Result<TemplateInstance>,
{
    fn instantiate(&self) -> Result<TemplateInstance> {
        self()
    }
}

/// Resolves template references stored in savegames.
pub trait TemplateRegistry {
    /// Looks up a template by reference.
    fn resolve(&self, reference: &str) -> Option<&dyn Template>;
}

/// A simple map-backed [`TemplateRegistry`].
#[derive(Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, Box<dyn Template>>,
}

impl TemplateLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `template` under `reference`, replacing any previous one.
    pub fn register(&mut self, reference: impl Into<String>, template: impl Template + 'static) {
        self.templates.insert(reference.into(), Box::new(template));
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` when no template is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateRegistry for TemplateLibrary {
    fn resolve(&self, reference: &str) -> Option<&dyn Template> {
        self.templates.get(reference).map(|t| t.as_ref())
    }
}

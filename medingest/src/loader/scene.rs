//! Collaborators the loader commits into.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::dataset::DecodedResult;
use crate::error::IngestResult;
use crate::queue::SceneKeys;
use crate::BoxFuture;

/// Handle of an object registered in the scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneObjectId(pub String);

impl SceneObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SceneObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One dataset to register.
#[derive(Debug, Clone)]
pub struct Registration {
    pub decoded: Arc<DecodedResult>,
    pub scene_keys: SceneKeys,
}

/// Initial state of an attached labelmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelmapState {
    pub selected_label: u32,
    pub last_color_index: u32,
}

impl Default for LabelmapState {
    fn default() -> Self {
        Self {
            selected_label: 1,
            last_color_index: 1,
        }
    }
}

/// The scene that receives decoded datasets.
///
/// Implementations own their own synchronisation; the loader calls these
/// methods from async context but never across an `.await`.
pub trait Scene: Send + Sync {
    /// Register datasets, returning one id per registration in order.
    fn register(&self, registrations: &[Registration]) -> IngestResult<Vec<SceneObjectId>>;

    /// Ids of all base images, oldest first.
    fn base_images(&self) -> Vec<SceneObjectId>;

    /// Attach a labelmap to a base image.
    fn attach_labelmap(&self, image: &SceneObjectId, labelmap: &SceneObjectId) -> IngestResult<()>;

    /// Set the initial paint state of a labelmap.
    fn set_labelmap_state(&self, labelmap: &SceneObjectId, state: LabelmapState) -> IngestResult<()>;

    /// Attach one measurement record to an image.
    fn add_measurement(
        &self,
        image: &SceneObjectId,
        component_name: &str,
        data: &Value,
    ) -> IngestResult<()>;
}

/// Replays a project-state bundle into the scene.
///
/// The loader awaits the returned future before registering anything else.
pub trait StateRestorer: Send + Sync {
    fn restore<'a>(&'a self, bundle: &'a DecodedResult) -> BoxFuture<'a, IngestResult<()>>;
}

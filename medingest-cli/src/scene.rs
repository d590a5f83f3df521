//! A scene that records what it receives in the log.
//!
//! The CLI has no renderer; committing into this scene shows what a viewer
//! would have been handed.

use medingest::dataset::{DecodedResult, Dataset};
use medingest::loader::{LabelmapState, Registration, Scene, SceneObjectId, StateRestorer};
use medingest::{BoxFuture, IngestError, IngestResult};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Default)]
struct SceneState {
    next_id: usize,
    base_images: Vec<SceneObjectId>,
    objects: Vec<(SceneObjectId, String)>,
}

/// Logs every registration and attachment.
#[derive(Debug, Default)]
pub struct LoggingScene {
    state: Mutex<SceneState>,
}

impl LoggingScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered objects as `(id, name)`, in registration order.
    pub fn objects(&self) -> Vec<(SceneObjectId, String)> {
        self.state.lock().objects.clone()
    }
}

impl Scene for LoggingScene {
    fn register(&self, registrations: &[Registration]) -> IngestResult<Vec<SceneObjectId>> {
        let mut state = self.state.lock();
        let mut ids = Vec::with_capacity(registrations.len());

        for registration in registrations {
            let decoded = &registration.decoded;
            state.next_id += 1;
            let id = SceneObjectId::new(format!("object-{}", state.next_id));

            let dataset = decoded.materialize()?;
            info!(id = %id, name = %decoded.name, kind = dataset.kind(), "Registered dataset");
            if matches!(dataset, Dataset::Image(_)) {
                state.base_images.push(id.clone());
            }

            state.objects.push((id.clone(), decoded.name.clone()));
            ids.push(id);
        }
        Ok(ids)
    }

    fn base_images(&self) -> Vec<SceneObjectId> {
        self.state.lock().base_images.clone()
    }

    fn attach_labelmap(&self, image: &SceneObjectId, labelmap: &SceneObjectId) -> IngestResult<()> {
        info!(image = %image, labelmap = %labelmap, "Attached labelmap");
        Ok(())
    }

    fn set_labelmap_state(&self, labelmap: &SceneObjectId, state: LabelmapState) -> IngestResult<()> {
        info!(
            labelmap = %labelmap,
            selected_label = state.selected_label,
            last_color_index = state.last_color_index,
            "Labelmap state set"
        );
        Ok(())
    }

    fn add_measurement(&self, image: &SceneObjectId, component_name: &str, _data: &Value) -> IngestResult<()> {
        info!(image = %image, component = component_name, "Added measurement");
        Ok(())
    }
}

/// Accepts any state bundle and logs its size.
#[derive(Debug, Default)]
pub struct LoggingRestorer;

impl StateRestorer for LoggingRestorer {
    fn restore<'a>(&'a self, bundle: &'a DecodedResult) -> BoxFuture<'a, IngestResult<()>> {
        Box::pin(async move {
            match bundle.materialize()? {
                Dataset::StateBundle(bytes) => {
                    info!(name = %bundle.name, bytes = bytes.len(), "Restored project state");
                    Ok(())
                }
                other => Err(IngestError::Restore(format!(
                    "{} is a {}, not a state bundle",
                    bundle.name,
                    other.kind()
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medingest::dataset::{DataArray, ImageData, ScalarValues};
    use medingest::queue::SceneKeys;
    use std::sync::Arc;

    fn registration(name: &str, dataset: Dataset) -> Registration {
        Registration {
            decoded: Arc::new(DecodedResult::dataset(name, dataset)),
            scene_keys: SceneKeys::default(),
        }
    }

    fn image() -> Dataset {
        let scalars = DataArray::new("Scalars", 1, ScalarValues::Uint8(vec![0]));
        Dataset::Image(ImageData::with_dimensions([1, 1, 1], [1.0; 3], scalars))
    }

    #[test]
    fn test_register_tracks_base_images() {
        let scene = LoggingScene::new();
        let ids = scene
            .register(&[
                registration("ct.vti", image()),
                registration("m.json", Dataset::Measurements(vec![])),
            ])
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(scene.base_images(), vec![ids[0].clone()]);
        assert_eq!(scene.objects()[1].1, "m.json");
    }

    #[tokio::test]
    async fn test_restorer_rejects_non_bundle() {
        let restorer = LoggingRestorer;
        let decoded = DecodedResult::dataset("ct.vti", image());
        assert!(restorer.restore(&decoded).await.is_err());
    }
}

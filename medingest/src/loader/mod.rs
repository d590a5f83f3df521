//! Commit of decoded entries into the scene.
//!
//! A [`Loader`] pass takes the queue's `Ready` entries in queue order and:
//!
//! 1. restores the project-state bundle, if one is ready, and waits for it
//! 2. registers regular datasets, then labelmaps
//! 3. attaches the new labelmaps and all measurement records to the most
//!    recently registered base image
//!
//! The pass always settles with a [`LoadReport`]. The queue's loading flag is
//! set for its whole duration.

mod scene;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::error::{IngestError, IngestResult};
use crate::queue::{FileEntry, FileQueue};

pub use scene::{LabelmapState, Registration, Scene, SceneObjectId, StateRestorer};

/// Outcome of one commit pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Whether a project-state bundle was restored.
    pub restored_state: bool,
    /// Scene ids of every dataset registered, in registration order.
    pub registered: Vec<SceneObjectId>,
    pub labelmaps_attached: usize,
    pub measurements_attached: usize,
    /// Error that ended the pass early, if any.
    pub failure: Option<String>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Ready entries split by role.
#[derive(Default)]
struct Partition {
    regular: Vec<FileEntry>,
    labelmaps: Vec<FileEntry>,
    measurements: Vec<FileEntry>,
}

/// Commits a queue's ready entries into a scene.
pub struct Loader {
    queue: FileQueue,
    scene: Arc<dyn Scene>,
    restorer: Arc<dyn StateRestorer>,
}

impl Loader {
    pub fn new(queue: FileQueue, scene: Arc<dyn Scene>, restorer: Arc<dyn StateRestorer>) -> Self {
        Self {
            queue,
            scene,
            restorer,
        }
    }

    /// Run one commit pass.
    pub async fn load(&self) -> LoadReport {
        let _loading = self.queue.begin_loading();
        let mut report = LoadReport::default();

        if let Err(e) = self.commit(&mut report).await {
            warn!(error = %e, "Load pass ended early");
            report.failure = Some(e.to_string());
        }

        info!(
            registered = report.registered.len(),
            labelmaps = report.labelmaps_attached,
            measurements = report.measurements_attached,
            restored_state = report.restored_state,
            "Load pass finished"
        );
        report
    }

    async fn commit(&self, report: &mut LoadReport) -> IngestResult<()> {
        let config = self.queue.config();
        let ready = self.queue.ready_entries();
        let bundle_ext = config.state_bundle_extension.as_str();

        let bundle = ready
            .iter()
            .find(|e| e.extension == bundle_ext)
            .and_then(|e| e.decoded());
        if let Some(bundle) = bundle {
            info!(name = %bundle.name, "Restoring project state");
            self.restorer.restore(bundle).await?;
            report.restored_state = true;
        }

        let mut parts = Partition::default();
        for entry in ready.into_iter().filter(|e| e.extension != bundle_ext) {
            if entry.scene_keys.data_type() == Some(config.labelmap_marker.as_str()) {
                parts.labelmaps.push(entry);
            } else if entry.name.ends_with(&config.measurement_suffix) {
                parts.measurements.push(entry);
            } else {
                parts.regular.push(entry);
            }
        }

        for entry in &parts.regular {
            let ids = self.register(entry)?;
            report.registered.extend(ids);
        }

        let mut labelmap_ids = Vec::new();
        for entry in &parts.labelmaps {
            let ids = self.register(entry)?;
            labelmap_ids.extend(ids.iter().cloned());
            report.registered.extend(ids);
        }

        let Some(target) = self.scene.base_images().pop() else {
            debug!(
                labelmaps = labelmap_ids.len(),
                measurement_files = parts.measurements.len(),
                "No base image, nothing to attach"
            );
            return Ok(());
        };

        for labelmap in &labelmap_ids {
            self.scene.attach_labelmap(&target, labelmap)?;
            self.scene
                .set_labelmap_state(labelmap, LabelmapState::default())?;
            report.labelmaps_attached += 1;
        }

        for entry in &parts.measurements {
            report.measurements_attached += self.attach_measurements(&target, entry)?;
        }

        Ok(())
    }

    /// Register one entry, adding its URL and applying scene metadata.
    fn register(&self, entry: &FileEntry) -> IngestResult<Vec<SceneObjectId>> {
        let decoded = entry.decoded().ok_or_else(|| {
            IngestError::Scene(format!("{} is not ready", entry.name))
        })?;

        let needs_url = entry.remote.is_some();
        let has_meta = entry.scene_keys.meta().is_some();

        let decoded = if needs_url || has_meta {
            let mut result = (**decoded).clone();
            if let Some(remote) = &entry.remote {
                result
                    .metadata
                    .insert("url".to_string(), Value::String(remote.url.clone()));
            }
            if has_meta {
                result = result.post_process(
                    entry.scene_keys.data_type(),
                    &self.queue.config().labelmap_marker,
                )?;
            }
            Arc::new(result)
        } else {
            Arc::clone(decoded)
        };

        debug!(entry = %entry.id, name = %entry.name, "Registering dataset");
        self.scene.register(&[Registration {
            decoded,
            scene_keys: entry.scene_keys.clone(),
        }])
    }

    fn attach_measurements(&self, target: &SceneObjectId, entry: &FileEntry) -> IngestResult<usize> {
        let Some(decoded) = entry.decoded() else {
            return Ok(0);
        };

        match decoded.materialize()? {
            Dataset::Measurements(records) => {
                for record in &records {
                    self.scene
                        .add_measurement(target, &record.component_name, &record.data)?;
                }
                Ok(records.len())
            }
            other => {
                debug!(name = %entry.name, kind = other.kind(), "Not a measurement list, skipped");
                Ok(0)
            }
        }
    }
}

//! Named payload templates
//!
//! A preset is a saved `(kind, payload)` pair the composer can load with one
//! click. Loading copies it into a [`Draft`]; editing the draft afterwards
//! never touches the preset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::persistence::{self, KeyValueStore, keys};
use crate::types::{Draft, FrameKind};
use crate::{ConsoleError, Result};

/// Opaque preset identifier (UUID v4)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct PresetId(String);

impl PresetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PresetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Saved composer template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(rename = "content")]
    pub payload: String,
}

impl Preset {
    /// Copy into a composer draft
    pub fn draft(&self) -> Draft {
        Draft::new(self.kind, self.payload.clone())
    }
}

fn default_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: PresetId::generate(),
            name: "Login JSON".to_string(),
            kind: FrameKind::Json,
            payload: r#"{"action":"LOGIN","uid":1001}"#.to_string(),
        },
        Preset {
            id: PresetId::generate(),
            name: "Ping Text".to_string(),
            kind: FrameKind::Text,
            payload: "PING".to_string(),
        },
    ]
}

fn validate(name: &str, draft: &Draft) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConsoleError::invalid_preset("name must not be blank"));
    }
    if draft.is_blank() {
        return Err(ConsoleError::invalid_preset("payload must not be blank"));
    }
    if !draft.kind.is_composable() {
        return Err(ConsoleError::invalid_preset(format!(
            "{} is not a composer mode",
            draft.kind.label()
        )));
    }
    Ok(())
}

/// Ordered preset collection backed by a key-value store
pub struct PresetBook {
    presets: Vec<Preset>,
    store: Arc<dyn KeyValueStore>,
}

impl PresetBook {
    /// Load from `store`, using the built-in presets when nothing usable is stored
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let presets = persistence::load_or(store.as_ref(), keys::PRESETS, default_presets());
        debug!(count = presets.len(), "Loaded presets");
        Self { presets, store }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get(&self, id: &PresetId) -> Option<&Preset> {
        self.presets.iter().find(|preset| &preset.id == id)
    }

    /// Append a new preset
    pub fn create(&mut self, name: impl Into<String>, draft: Draft) -> Result<&Preset> {
        let name = name.into();
        validate(&name, &draft)?;

        let preset = Preset { id: PresetId::generate(), name, kind: draft.kind, payload: draft.payload };
        info!(id = %preset.id, name = %preset.name, "Preset created");
        self.presets.push(preset);
        self.persist();

        let index = self.presets.len() - 1;
        Ok(&self.presets[index])
    }

    /// Replace name, kind and payload of an existing preset in place
    pub fn update(&mut self, id: &PresetId, name: impl Into<String>, draft: Draft) -> Result<&Preset> {
        let name = name.into();
        validate(&name, &draft)?;

        let index = self.position(id)?;
        let preset = &mut self.presets[index];
        preset.name = name;
        preset.kind = draft.kind;
        preset.payload = draft.payload;
        info!(%id, "Preset updated");
        self.persist();

        Ok(&self.presets[index])
    }

    pub fn delete(&mut self, id: &PresetId) -> Result<Preset> {
        let index = self.position(id)?;
        let removed = self.presets.remove(index);
        info!(%id, "Preset deleted");
        self.persist();
        Ok(removed)
    }

    fn position(&self, id: &PresetId) -> Result<usize> {
        self.presets
            .iter()
            .position(|preset| &preset.id == id)
            .ok_or_else(|| ConsoleError::PresetNotFound { id: id.to_string() })
    }

    fn persist(&self) {
        persistence::save_json(self.store.as_ref(), keys::PRESETS, &self.presets);
    }
}

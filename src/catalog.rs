use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::EvalError;

const CHAT_TASKS: [&str; 2] = ["chat", "question_answering"];
const CHAT_FUNCTIONS: [&str; 2] = ["chat", "text_chat"];
const VISUAL_ID_MARKERS: [&str; 6] = ["vision", "visual", "image", "vlm", "clip", "vit"];
const VISUAL_TASK_MARKERS: [&str; 2] = ["visual", "image"];
const EXCLUDED_ID_MARKERS: [&str; 3] = ["guardian", "llama-3-405b", "code-instruct"];
const DEPRECATED: &str = "deprecated";

#[derive(Debug, Deserialize)]
pub struct ModelCatalog {
    pub resources: Vec<ModelSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    pub model_id: String,
    #[serde(default)]
    pub lifecycle: Vec<Tagged>,
    #[serde(default)]
    pub tasks: Vec<Tagged>,
    #[serde(default)]
    pub functions: Vec<Tagged>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tagged {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Deprecated,
    NoChat,
    Visual,
    Excluded,
}

impl Exclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deprecated => "deprecated",
            Self::NoChat => "no_chat",
            Self::Visual => "visual",
            Self::Excluded => "excluded",
        }
    }
}

impl ModelSpec {
    pub fn exclusion(&self) -> Option<Exclusion> {
        if has_id(&self.lifecycle, &[DEPRECATED]) {
            return Some(Exclusion::Deprecated);
        }
        if !has_id(&self.tasks, &CHAT_TASKS) && !has_id(&self.functions, &CHAT_FUNCTIONS) {
            return Some(Exclusion::NoChat);
        }

        let id = self.model_id.to_lowercase();
        let visual_task = self.tasks.iter().any(|task| {
            let task = task.id.to_lowercase();
            VISUAL_TASK_MARKERS.iter().any(|marker| task.contains(marker))
        });
        if visual_task || VISUAL_ID_MARKERS.iter().any(|marker| id.contains(marker)) {
            return Some(Exclusion::Visual);
        }
        if EXCLUDED_ID_MARKERS.iter().any(|marker| id.contains(marker)) {
            return Some(Exclusion::Excluded);
        }
        None
    }
}

fn has_id(tags: &[Tagged], wanted: &[&str]) -> bool {
    tags.iter().any(|tag| wanted.contains(&tag.id.as_str()))
}

pub fn load_catalog(path: &Path) -> Result<ModelCatalog> {
    if !path.is_file() {
        return Err(EvalError::NotFound {
            what: "model catalog",
            path: path.to_path_buf(),
        }
        .into());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn chat_models(catalog: &ModelCatalog) -> Vec<String> {
    let mut selected = Vec::new();
    let mut skipped = [0_usize; 4];

    for spec in &catalog.resources {
        match spec.exclusion() {
            Some(reason) => {
                debug!(model_id = %spec.model_id, reason = reason.as_str(), "skipping model");
                skipped[reason as usize] += 1;
            }
            None => selected.push(spec.model_id.clone()),
        }
    }
    selected.sort();
    selected.dedup();

    info!(
        count = selected.len(),
        deprecated_skipped = skipped[Exclusion::Deprecated as usize],
        no_chat_skipped = skipped[Exclusion::NoChat as usize],
        visual_skipped = skipped[Exclusion::Visual as usize],
        excluded_skipped = skipped[Exclusion::Excluded as usize],
        "models listed"
    );
    selected
}

pub fn select_models(
    explicit: &[String],
    catalog: Option<&ModelCatalog>,
) -> Result<Vec<String>, EvalError> {
    let mut seen = HashSet::new();
    let mut models = Vec::new();

    let catalog_models = catalog.map(chat_models).unwrap_or_default();
    let candidates = explicit
        .iter()
        .map(|id| id.trim())
        .chain(catalog_models.iter().map(String::as_str));
    for model in candidates {
        if model.is_empty() || !seen.insert(model.to_string()) {
            continue;
        }
        models.push(model.to_string());
    }

    if models.is_empty() {
        return Err(EvalError::config(
            "no models selected; pass --model or a --model-catalog with chat-capable models",
        ));
    }
    Ok(models)
}

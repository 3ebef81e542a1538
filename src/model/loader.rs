//! Load model declarations from a directory of JSON files.

use crate::error::GenerationError;
use crate::model::ModelConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    Many(Vec<ModelConfig>),
    One(ModelConfig),
}

/// Parse one file body: a single model object or an array of them.
pub fn parse_models(source: &str, body: &str) -> Result<Vec<ModelConfig>, GenerationError> {
    let parsed: ModelFile = serde_json::from_str(body)
        .map_err(|e| GenerationError::Load(format!("{}: {}", source, e)))?;
    Ok(match parsed {
        ModelFile::Many(models) => models,
        ModelFile::One(model) => vec![model],
    })
}

/// Read every `*.json` file in `dir`, in file-name order.
pub async fn load_models_from_dir(dir: impl AsRef<Path>) -> Result<Vec<ModelConfig>, GenerationError> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| GenerationError::Load(format!("{}: {}", dir.display(), e)))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GenerationError::Load(format!("{}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut models = Vec::new();
    for path in paths {
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GenerationError::Load(format!("{}: {}", path.display(), e)))?;
        let parsed = parse_models(&path.display().to_string(), &body)?;
        tracing::debug!(file = %path.display(), count = parsed.len(), "loaded model declarations");
        models.extend(parsed);
    }
    Ok(models)
}

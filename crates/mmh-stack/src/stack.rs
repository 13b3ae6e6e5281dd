//! Generic layered stack

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StackError;
use crate::layer::Layer;

/// An ordered collection of layers with first-layer-wins lookup.
///
/// Sources are registered with [`Stack::push`] and only read on
/// [`Stack::load`]. Until then the stack holds no data and every lookup
/// fails with [`StackError::NoData`].
#[derive(Debug, Clone)]
pub struct Stack {
    desc: String,
    sources: Vec<PathBuf>,
    overrides: Vec<Layer>,
    fallbacks: Vec<Layer>,
    layers: Option<Vec<Layer>>,
}

impl Stack {
    /// Create an empty, unloaded stack. `desc` names it in log output.
    pub fn new(desc: impl Into<String>) -> Self {
        Self {
            desc: desc.into(),
            sources: Vec::new(),
            overrides: Vec::new(),
            fallbacks: Vec::new(),
            layers: None,
        }
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Register a layer source. No I/O happens until [`Stack::load`].
    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.sources.push(path.into());
    }

    /// Insert an in-memory layer at the highest precedence.
    pub fn push_layer(&mut self, layer: Layer) {
        if let Some(layers) = self.layers.as_mut() {
            layers.insert(0, layer.clone());
        }
        self.overrides.insert(0, layer);
    }

    /// Register an in-memory layer placed below every file layer.
    pub fn with_fallback(mut self, layer: Layer) -> Self {
        self.fallbacks.push(layer);
        self
    }

    /// Registered file sources, in registration order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Read every existing source in registration order.
    ///
    /// Missing files are skipped; files that exist but cannot be read or
    /// parsed are errors.
    pub fn load(&mut self) -> Result<(), StackError> {
        let mut layers = self.overrides.clone();

        for path in &self.sources {
            if !path.is_file() {
                debug!(stack = %self.desc, path = %path.display(), "skipping missing layer");
                continue;
            }
            let layer = Layer::from_file(path)?;
            info!(stack = %self.desc, path = %path.display(), "loaded layer");
            layers.push(layer);
        }

        layers.extend(self.fallbacks.iter().cloned());
        self.layers = Some(layers);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.layers.is_some()
    }

    /// Loaded layers in precedence order.
    pub fn layers(&self) -> Result<&[Layer], StackError> {
        self.layers.as_deref().ok_or_else(|| StackError::NoData {
            stack: self.desc.clone(),
        })
    }

    /// Loaded layers, or an empty slice if the stack was never loaded.
    pub fn layers_or_empty(&self) -> &[Layer] {
        self.layers.as_deref().unwrap_or(&[])
    }

    /// Value of `key` from the highest-precedence layer defining it.
    pub fn lookup(&self, key: &str) -> Result<&Value, StackError> {
        self.layers()?
            .iter()
            .find_map(|layer| layer.get(key))
            .ok_or_else(|| StackError::UnknownItem(key.to_string()))
    }

    /// Directory of the highest-precedence file layer defining `key`.
    pub fn origin_root(&self, key: &str) -> Option<&Path> {
        self.layers_or_empty()
            .iter()
            .find(|layer| layer.get(key).is_some())
            .and_then(Layer::root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerOrigin;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_lookup_before_load_is_no_data() {
        let mut stack = Stack::new("config");
        stack.push("/nonexistent/config.yaml");

        let err = stack.lookup("log-all").unwrap_err();
        assert!(err.is_no_data());
        assert!(!matches!(err, StackError::UnknownItem(_)));
    }

    #[test]
    fn test_first_registered_layer_wins() {
        let dir = TempDir::new().unwrap();
        let high = write(&dir, "high.yaml", "build-tool: make\n");
        let low = write(&dir, "low.yaml", "build-tool: ninja\nonly-low: 1\n");

        let mut stack = Stack::new("config");
        stack.push(&high);
        stack.push(&low);
        stack.load().unwrap();

        assert_eq!(stack.lookup("build-tool").unwrap(), "make");
        assert_eq!(stack.lookup("only-low").unwrap(), 1);
        assert_eq!(stack.origin_root("build-tool"), Some(dir.path()));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let present = write(&dir, "present.yaml", "a: 1\n");

        let mut stack = Stack::new("config");
        stack.push(dir.path().join("absent.yaml"));
        stack.push(&present);
        stack.load().unwrap();

        assert_eq!(stack.layers().unwrap().len(), 1);
        assert_eq!(stack.lookup("a").unwrap(), 1);
    }

    #[test]
    fn test_unknown_item_after_load() {
        let mut stack = Stack::new("config");
        stack.load().unwrap();

        let err = stack.lookup("missing").unwrap_err();
        assert!(matches!(err, StackError::UnknownItem(ref k) if k == "missing"));
    }

    #[test]
    fn test_override_and_fallback_placement() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "file.yaml", "log-all: false\ncmake: cmake3\n");

        let fallback = Layer::from_value(
            LayerOrigin::Builtin,
            json!({"log-all": false, "cmake": "cmake", "ctest": "ctest"}),
        );
        let mut stack = Stack::new("config").with_fallback(fallback);
        stack.push(&file);
        stack.push_layer(Layer::from_value(LayerOrigin::Cli, json!({"log-all": true})));
        stack.load().unwrap();

        assert_eq!(stack.lookup("log-all").unwrap(), true);
        assert_eq!(stack.lookup("cmake").unwrap(), "cmake3");
        assert_eq!(stack.lookup("ctest").unwrap(), "ctest");
    }

    #[test]
    fn test_push_layer_after_load() {
        let mut stack = Stack::new("config");
        stack.load().unwrap();
        stack.push_layer(Layer::from_value(LayerOrigin::Cli, json!({"x": 1})));

        assert_eq!(stack.lookup("x").unwrap(), 1);
    }
}

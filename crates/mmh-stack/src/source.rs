//! Module source metadata stack

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::StackError;
use crate::layer::Layer;
use crate::stack::Stack;

/// Module `type` used when no layer sets one
pub const DEFAULT_MODULE_TYPE: &str = "git";

const MODULES_KEY: &str = "modules";
const TYPE_KEY: &str = "type";

/// Effective source metadata for one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleEntry {
    pub name: String,

    /// Source type (`git` unless a layer says otherwise)
    #[serde(rename = "type")]
    pub kind: String,

    /// Every other attribute, merged across layers
    pub attributes: BTreeMap<String, Value>,
}

impl ModuleEntry {
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }
}

/// Stack of `modules:` maps describing where module sources live.
#[derive(Debug, Clone)]
pub struct SourceStack {
    stack: Stack,
}

impl SourceStack {
    pub fn new(desc: impl Into<String>) -> Self {
        Self {
            stack: Stack::new(desc),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.stack.push(path);
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.stack.push_layer(layer);
    }

    pub fn load(&mut self) -> Result<(), StackError> {
        self.stack.load()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// All known module names, de-duplicated, in first-seen order.
    pub fn all_sources(&self) -> Result<Vec<String>, StackError> {
        let mut names: Vec<String> = Vec::new();
        for modules in self.module_maps()? {
            for name in modules.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        Ok(names)
    }

    /// Effective attributes for `name`.
    ///
    /// Attributes are the union of every layer's entry for the module. On a
    /// conflict the higher-precedence (earlier) layer wins. `type` defaults to
    /// [`DEFAULT_MODULE_TYPE`].
    pub fn lookup(&self, name: &str) -> Result<ModuleEntry, StackError> {
        let entries: Vec<&Value> = self
            .module_maps()?
            .filter_map(|modules| modules.get(name))
            .collect();

        if entries.is_empty() {
            return Err(StackError::UnknownModule(name.to_string()));
        }

        // Lowest precedence first so higher layers overwrite.
        let mut attributes = BTreeMap::new();
        for entry in entries.iter().rev() {
            if let Value::Object(map) = entry {
                for (key, value) in map {
                    attributes.insert(key.clone(), value.clone());
                }
            }
        }

        let kind = match attributes.remove(TYPE_KEY) {
            Some(Value::String(kind)) => kind,
            _ => DEFAULT_MODULE_TYPE.to_string(),
        };

        Ok(ModuleEntry {
            name: name.to_string(),
            kind,
            attributes,
        })
    }

    fn module_maps(&self) -> Result<impl Iterator<Item = &Map<String, Value>>, StackError> {
        Ok(self
            .stack
            .layers()?
            .iter()
            .filter_map(|layer| layer.get(MODULES_KEY).and_then(Value::as_object)))
    }
}

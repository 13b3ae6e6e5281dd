//! Tool configuration stack

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::StackError;
use crate::layer::Layer;
use crate::stack::Stack;

const TOOLCHAINS_KEY: &str = "toolchains";
const BUILDTOOLS_KEY: &str = "buildtools";
const BUILDCONFIGS_KEY: &str = "buildconfigs";

/// A toolchain as declared in a configuration layer.
///
/// Layers may list a toolchain as a bare name or as a record with a `name`
/// and an `architecture` (a string or a possibly nested list of strings).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolchainEntry {
    pub name: String,
    pub architectures: Vec<String>,
    /// Remaining attributes of the record
    pub attributes: Map<String, Value>,
}

impl ToolchainEntry {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self {
                name: name.clone(),
                architectures: Vec::new(),
                attributes: Map::new(),
            }),
            Value::Object(map) => {
                let name = map.get("name")?.as_str()?.to_string();
                let mut architectures = BTreeSet::new();
                if let Some(arch) = map.get("architecture") {
                    flatten_strings(arch, &mut architectures);
                }
                let attributes = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "name" && k.as_str() != "architecture")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Some(Self {
                    name,
                    architectures: architectures.into_iter().collect(),
                    attributes,
                })
            }
            _ => None,
        }
    }
}

/// Configuration stack with toolchain and build-tool queries.
#[derive(Debug, Clone)]
pub struct ConfigStack {
    stack: Stack,
}

impl ConfigStack {
    pub fn new(desc: impl Into<String>) -> Self {
        Self::from_stack(Stack::new(desc))
    }

    /// Wrap a prepared generic stack (e.g. one with fallback layers).
    pub fn from_stack(stack: Stack) -> Self {
        Self { stack }
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

    pub fn lookup(&self, key: &str) -> Result<&Value, StackError> {
        self.stack.lookup(key)
    }

    pub fn lookup_bool(&self, key: &str) -> Result<bool, StackError> {
        self.lookup(key)?.as_bool().ok_or(StackError::InvalidType {
            key: key.to_string(),
            expected: "boolean",
        })
    }

    pub fn lookup_str(&self, key: &str) -> Result<&str, StackError> {
        self.lookup(key)?.as_str().ok_or(StackError::InvalidType {
            key: key.to_string(),
            expected: "string",
        })
    }

    /// First toolchain named `name`, searching layers in precedence order.
    pub fn fetch_toolchain(&self, name: &str) -> Result<ToolchainEntry, StackError> {
        self.stack
            .layers()?
            .iter()
            .filter_map(|layer| layer.get(TOOLCHAINS_KEY).and_then(Value::as_array))
            .flatten()
            .filter_map(ToolchainEntry::from_value)
            .find(|tc| tc.name == name)
            .ok_or_else(|| StackError::UnknownItem(name.to_string()))
    }

    /// Names of every toolchain in every layer
    pub fn all_toolchains(&self) -> BTreeSet<String> {
        self.toolchain_entries().map(|tc| tc.name).collect()
    }

    /// Architectures of every toolchain in every layer
    pub fn all_architectures(&self) -> BTreeSet<String> {
        self.toolchain_entries()
            .flat_map(|tc| tc.architectures)
            .collect()
    }

    pub fn all_buildtools(&self) -> BTreeSet<String> {
        self.query_item(BUILDTOOLS_KEY)
    }

    pub fn all_buildconfigs(&self) -> BTreeSet<String> {
        self.query_item(BUILDCONFIGS_KEY)
    }

    // Aggregate queries treat an unloaded stack as empty.
    fn toolchain_entries(&self) -> impl Iterator<Item = ToolchainEntry> + '_ {
        self.stack
            .layers_or_empty()
            .iter()
            .filter_map(|layer| layer.get(TOOLCHAINS_KEY).and_then(Value::as_array))
            .flatten()
            .filter_map(ToolchainEntry::from_value)
    }

    fn query_item(&self, key: &str) -> BTreeSet<String> {
        let mut items = BTreeSet::new();
        for layer in self.stack.layers_or_empty() {
            if let Some(value) = layer.get(key) {
                flatten_strings(value, &mut items);
            }
        }
        items
    }
}

fn flatten_strings(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            out.insert(s.clone());
        }
        Value::Array(items) => {
            for item in items {
                flatten_strings(item, out);
            }
        }
        _ => {}
    }
}

//! A single configuration layer and its provenance.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StackError;

/// Where a layer came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOrigin {
    /// Loaded from a file on disk
    File {
        path: PathBuf,
        /// SHA-256 digest of the raw file bytes
        digest: String,
    },
    /// Hard-coded defaults
    Builtin,
    /// Command-line overrides
    Cli,
}

impl std::fmt::Display for LayerOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerOrigin::File { path, .. } => write!(f, "{}", path.display()),
            LayerOrigin::Builtin => write!(f, "<builtin>"),
            LayerOrigin::Cli => write!(f, "<command line>"),
        }
    }
}

/// One loaded configuration source: an ordered key/value mapping.
#[derive(Debug, Clone)]
pub struct Layer {
    origin: LayerOrigin,
    data: Map<String, Value>,
}

impl Layer {
    /// Create a layer from an already-built mapping
    pub fn new(origin: LayerOrigin, data: Map<String, Value>) -> Self {
        Self { origin, data }
    }

    /// Create a layer from a JSON value; anything but an object yields an
    /// empty layer.
    pub fn from_value(origin: LayerOrigin, value: Value) -> Self {
        match value {
            Value::Object(data) => Self::new(origin, data),
            _ => Self::new(origin, Map::new()),
        }
    }

    /// Load a layer from a YAML or TOML file (chosen by extension).
    pub fn from_file(path: &Path) -> Result<Self, StackError> {
        let bytes = fs::read(path).map_err(|source| StackError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes).map_err(|e| StackError::Parse {
            path: path.to_path_buf(),
            message: format!("invalid UTF-8: {}", e),
        })?;

        let value = if is_toml(path) {
            parse_toml(path, &contents)?
        } else {
            parse_yaml(path, &contents)?
        };

        let data = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(StackError::Parse {
                    path: path.to_path_buf(),
                    message: format!("top level must be a mapping, found {}", kind_of(&other)),
                })
            }
        };

        Ok(Self::new(
            LayerOrigin::File {
                path: path.to_path_buf(),
                digest,
            },
            data,
        ))
    }

    pub fn origin(&self) -> &LayerOrigin {
        &self.origin
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Value for `key` in this layer only
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Directory containing the layer's file, if it was loaded from one
    pub fn root(&self) -> Option<&Path> {
        match &self.origin {
            LayerOrigin::File { path, .. } => path.parent(),
            _ => None,
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

fn parse_yaml(path: &Path, contents: &str) -> Result<Value, StackError> {
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(contents).map_err(|e| StackError::Parse {
        path: path.to_path_buf(),
        message: format!("YAML parse error: {}", e),
    })?;
    yaml_to_json(yaml).map_err(|message| StackError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Configuration keys are strings; any other mapping key is rejected.
fn yaml_to_json(yaml: serde_yaml::Value) -> Result<Value, String> {
    Ok(match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(key) => key,
                    other => {
                        return Err(format!(
                            "mapping keys must be strings, found {}",
                            yaml_key_text(&other)
                        ))
                    }
                };
                map.insert(key, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key_text(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => format!("boolean `{}`", b),
        serde_yaml::Value::Number(n) => format!("number `{}`", n),
        serde_yaml::Value::Sequence(_) => "a list".to_string(),
        serde_yaml::Value::Mapping(_) => "a mapping".to_string(),
        serde_yaml::Value::String(s) => format!("`{}`", s),
        serde_yaml::Value::Tagged(tagged) => yaml_key_text(&tagged.value),
    }
}

fn parse_toml(path: &Path, contents: &str) -> Result<Value, StackError> {
    let value: toml::Value = toml::from_str(contents).map_err(|e| StackError::Parse {
        path: path.to_path_buf(),
        message: format!("TOML parse error: {}", e),
    })?;
    Ok(toml_to_json(value))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

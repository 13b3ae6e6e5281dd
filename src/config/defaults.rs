//! Built-in tool defaults (lowest configuration layer)

use serde::{Deserialize, Serialize};

use mmh_stack::{Layer, LayerOrigin};

/// Configuration key enabling tool output capture
pub const LOG_ALL: &str = "log-all";

/// Configuration key naming the cmake executable
pub const CMAKE: &str = "cmake";

/// Configuration key naming the ctest executable
pub const CTEST: &str = "ctest";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Forward every line of tool output to the log (default: false)
    pub log_all: bool,

    /// CMake executable (default: "cmake")
    pub cmake: String,

    /// CTest executable (default: "ctest")
    pub ctest: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            log_all: false,
            cmake: "cmake".to_string(),
            ctest: "ctest".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for layering
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            LOG_ALL: self.log_all,
            CMAKE: self.cmake,
            CTEST: self.ctest,
        })
    }

    /// The defaults as a stack layer
    pub fn to_layer(&self) -> Layer {
        Layer::from_value(LayerOrigin::Builtin, self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert!(!defaults.log_all);
        assert_eq!(defaults.cmake, "cmake");
        assert_eq!(defaults.ctest, "ctest");
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();
        assert_eq!(value["log-all"], false);
        assert_eq!(value["cmake"], "cmake");
        assert_eq!(value["ctest"], "ctest");
    }

    #[test]
    fn test_to_layer() {
        let layer = BuiltinDefaults::default().to_layer();
        assert_eq!(layer.origin(), &LayerOrigin::Builtin);
        assert_eq!(layer.get("cmake").and_then(|v| v.as_str()), Some("cmake"));
    }
}

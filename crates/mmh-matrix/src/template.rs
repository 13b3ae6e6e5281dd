//! `${name}` placeholder expansion for path templates
//!
//! `system.yaml` values such as `${system}/zephyr/kernel` or
//! `applications/${application}` are expanded when an instance is resolved.

use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

/// Variable holding the system root directory
pub const SYSTEM: &str = "system";

/// Variable holding the Zephyr application name
pub const APPLICATION: &str = "application";

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_-]*)\}").unwrap())
}

/// Replace every known `${name}` in `template`. Unknown names stay verbatim.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

//! Build matrix generation and instance selection

use globset::Glob;
use regex_lite::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::descriptor::InstanceDescriptor;
use crate::error::MatrixError;
use crate::spec::SystemSpec;

/// Every descriptor the system produces, sorted by descriptor string with
/// duplicates removed.
pub fn generate_matrix(spec: &SystemSpec) -> Vec<InstanceDescriptor> {
    let mut instances = Vec::new();

    for board in &spec.boards {
        let settings = spec.board_settings(board);
        for config in &settings.build_configs {
            for toolchain in &board.toolchains {
                instances.push(InstanceDescriptor::board(
                    &board.name,
                    toolchain.name(),
                    config,
                ));
            }
        }
    }

    for app in &spec.zephyr {
        for group in &app.build {
            // A group may narrow or replace the application's configurations
            let settings = spec.zephyr_settings(app, Some(group));
            for config in &settings.build_configs {
                for toolchain in &group.toolchains {
                    for board in &group.boards {
                        instances.push(InstanceDescriptor::zephyr(
                            board,
                            &app.application,
                            toolchain.name(),
                            config,
                        ));
                    }
                }
            }
        }
    }

    // Ordering is on the string form; field-wise ordering differs whenever
    // one name is a prefix of another.
    instances.sort_by_cached_key(|d| d.to_string());
    instances.dedup();
    instances
}

/// The generated matrix with its descriptor strings.
#[derive(Debug, Clone, Default)]
pub struct Matrix {
    instances: Vec<InstanceDescriptor>,
    names: Vec<String>,
}

impl Matrix {
    pub fn from_spec(spec: &SystemSpec) -> Self {
        let instances = generate_matrix(spec);
        let names = instances.iter().map(|d| d.to_string()).collect();
        Self { instances, names }
    }

    pub fn instances(&self) -> &[InstanceDescriptor] {
        &self.instances
    }

    /// Descriptor strings in matrix order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, desc: &str) -> bool {
        self.names.iter().any(|n| n == desc)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// True if `s` contains shell-style wildcard syntax
pub fn is_pattern(s: &str) -> bool {
    static BRACKET: OnceLock<Regex> = OnceLock::new();
    let bracket = BRACKET.get_or_init(|| Regex::new(r"\[.*\]").unwrap());
    s.contains('*') || s.contains('?') || bracket.is_match(s)
}

/// Expand wildcard patterns against the matrix.
///
/// Plain names pass through. A pattern is replaced by the matching matrix
/// entries in matrix order; a pattern matching nothing is kept as-is so that
/// validation can report it. Each name appears once, at its first position.
pub fn expand_patterns(matrix: &Matrix, requested: &[String]) -> Result<Vec<String>, MatrixError> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !expanded.contains(&name) {
            expanded.push(name);
        }
    };
    for item in requested {
        if !is_pattern(item) {
            push(item.clone());
            continue;
        }
        let matcher = Glob::new(item)
            .map_err(|e| MatrixError::InvalidPattern {
                pattern: item.clone(),
                message: e.to_string(),
            })?
            .compile_matcher();
        let matches: Vec<String> = matrix
            .names()
            .iter()
            .filter(|name| matcher.is_match(name.as_str()))
            .cloned()
            .collect();
        debug!(pattern = %item, matches = matches.len(), "expanded instance pattern");
        if matches.is_empty() {
            push(item.clone());
        } else {
            matches.into_iter().for_each(&mut push);
        }
    }
    Ok(expanded)
}

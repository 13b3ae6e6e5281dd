//! Instance descriptors

use std::fmt;
use std::str::FromStr;

use crate::error::MatrixError;

/// Kind of a build instance, the first descriptor segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    Board,
    Zephyr,
}

impl InstanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceKind::Board => "boards",
            InstanceKind::Zephyr => "zephyr",
        }
    }

    /// Number of `/`-separated fields in a descriptor of this kind
    pub fn field_count(&self) -> usize {
        match self {
            InstanceKind::Board => 4,
            InstanceKind::Zephyr => 5,
        }
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of the build matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceDescriptor {
    /// `boards/<board>/<toolchain>/<config>`
    Board {
        board: String,
        toolchain: String,
        config: String,
    },
    /// `zephyr/<board>/<application>/<toolchain>/<config>`
    Zephyr {
        board: String,
        application: String,
        toolchain: String,
        config: String,
    },
}

impl InstanceDescriptor {
    pub fn board(
        board: impl Into<String>,
        toolchain: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        InstanceDescriptor::Board {
            board: board.into(),
            toolchain: toolchain.into(),
            config: config.into(),
        }
    }

    pub fn zephyr(
        board: impl Into<String>,
        application: impl Into<String>,
        toolchain: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        InstanceDescriptor::Zephyr {
            board: board.into(),
            application: application.into(),
            toolchain: toolchain.into(),
            config: config.into(),
        }
    }

    /// Parse a descriptor string.
    ///
    /// Fails with [`MatrixError::InvalidSystemInstance`] unless the string has
    /// exactly the field count of its kind and no empty field.
    pub fn parse(desc: &str) -> Result<Self, MatrixError> {
        let invalid = || MatrixError::InvalidSystemInstance(desc.to_string());
        let fields: Vec<&str> = desc.split('/').collect();

        let kind = match fields[0] {
            "boards" => InstanceKind::Board,
            "zephyr" => InstanceKind::Zephyr,
            _ => return Err(invalid()),
        };
        if fields.len() != kind.field_count() || fields.iter().any(|f| f.is_empty()) {
            return Err(invalid());
        }

        Ok(match kind {
            InstanceKind::Board => Self::board(fields[1], fields[2], fields[3]),
            InstanceKind::Zephyr => Self::zephyr(fields[1], fields[2], fields[3], fields[4]),
        })
    }

    pub fn kind(&self) -> InstanceKind {
        match self {
            InstanceDescriptor::Board { .. } => InstanceKind::Board,
            InstanceDescriptor::Zephyr { .. } => InstanceKind::Zephyr,
        }
    }

    pub fn board_name(&self) -> &str {
        match self {
            InstanceDescriptor::Board { board, .. } | InstanceDescriptor::Zephyr { board, .. } => {
                board
            }
        }
    }

    pub fn application(&self) -> Option<&str> {
        match self {
            InstanceDescriptor::Board { .. } => None,
            InstanceDescriptor::Zephyr { application, .. } => Some(application),
        }
    }

    pub fn toolchain(&self) -> &str {
        match self {
            InstanceDescriptor::Board { toolchain, .. }
            | InstanceDescriptor::Zephyr { toolchain, .. } => toolchain,
        }
    }

    pub fn config(&self) -> &str {
        match self {
            InstanceDescriptor::Board { config, .. } | InstanceDescriptor::Zephyr { config, .. } => {
                config
            }
        }
    }
}

impl fmt::Display for InstanceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceDescriptor::Board {
                board,
                toolchain,
                config,
            } => write!(f, "boards/{}/{}/{}", board, toolchain, config),
            InstanceDescriptor::Zephyr {
                board,
                application,
                toolchain,
                config,
            } => write!(f, "zephyr/{}/{}/{}/{}", board, application, toolchain, config),
        }
    }
}

impl FromStr for InstanceDescriptor {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_board() {
        let d = InstanceDescriptor::parse("boards/nucleo/gcc/debug").unwrap();
        assert_eq!(d.kind(), InstanceKind::Board);
        assert_eq!(d.board_name(), "nucleo");
        assert_eq!(d.toolchain(), "gcc");
        assert_eq!(d.config(), "debug");
        assert_eq!(d.application(), None);
    }

    #[test]
    fn test_parse_zephyr() {
        let d: InstanceDescriptor = "zephyr/esp32/blinky/gcc/release".parse().unwrap();
        assert_eq!(d.kind(), InstanceKind::Zephyr);
        assert_eq!(d.board_name(), "esp32");
        assert_eq!(d.application(), Some("blinky"));
        assert_eq!(d.toolchain(), "gcc");
        assert_eq!(d.config(), "release");
    }

    #[test]
    fn test_display_inverts_parse() {
        for s in ["boards/nucleo/gcc/debug", "zephyr/esp32/blinky/gcc/release"] {
            assert_eq!(InstanceDescriptor::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_invalid_descriptors() {
        let bad = [
            "",
            "boards",
            "boards/nucleo/gcc",
            "boards/nucleo/gcc/debug/extra",
            "zephyr/esp32/blinky/gcc",
            "zephyr/esp32/blinky/gcc/debug/x",
            "modules/ufw/gcc/debug",
            "boards//gcc/debug",
            "Boards/nucleo/gcc/debug",
        ];
        for desc in bad {
            match InstanceDescriptor::parse(desc) {
                Err(MatrixError::InvalidSystemInstance(d)) => assert_eq!(d, desc),
                other => panic!("{:?} parsed as {:?}", desc, other),
            }
        }
    }
}

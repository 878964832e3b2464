//! Configuration for descriptor compilation.

use serde::{Deserialize, Serialize};

/// Default executable used when rendering the invocation command template.
pub const DEFAULT_EXECUTABLE: &str = "$__tool_directory__/ogcproc";

/// Options for compiling a process description.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `max-depth`), matching the
/// CLI flag names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompileOptions {
    /// Maximum nesting depth for object sections and enum extraction.
    pub max_depth: usize,
    /// Executable placed at the head of the command template.
    pub executable: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            executable: DEFAULT_EXECUTABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_options_serde_round_trip() {
        let opts = CompileOptions {
            max_depth: 8,
            executable: "/opt/tools/ogcproc".to_string(),
        };

        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"max-depth\""));
        assert!(json.contains("\"executable\""));

        let deserialized: CompileOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.max_depth, 8);
        assert_eq!(deserialized.executable, "/opt/tools/ogcproc");
    }

    #[test]
    fn test_default_depth_is_bounded() {
        let opts = CompileOptions::default();
        assert_eq!(opts.max_depth, 32);
        assert_eq!(opts.executable, DEFAULT_EXECUTABLE);
    }
}

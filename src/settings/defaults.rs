//! Built-in settings (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Config document, source-absolute
    pub config_file: String,

    /// Isolate maps consulted when none are given on the command line
    pub isolate_map_files: Vec<String>,

    /// Interpreter for the isolate tool
    pub python: String,

    /// Isolate tool script, source-absolute
    pub isolate_script: String,

    /// Environment variable carrying passthrough GN args
    pub passthrough_env: String,

    /// Command-line budget for analyze compile targets
    pub max_cmdline_len: usize,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            config_file: "//tools/mb/mb_config.toml".to_string(),
            isolate_map_files: vec!["//testing/buildbot/gn_isolate_map.json".to_string()],
            python: "python3".to_string(),
            isolate_script: "//tools/swarming_client/isolate.py".to_string(),
            passthrough_env: "GN_ARGS".to_string(),
            max_cmdline_len: mb_analyze::DEFAULT_MAX_CMDLINE_LEN,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a JSON value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "config_file": self.config_file,
            "isolate_map_files": self.isolate_map_files,
            "python": self.python,
            "isolate_script": self.isolate_script,
            "passthrough_env": self.passthrough_env,
            "analyze": {
                "max_cmdline_len": self.max_cmdline_len
            }
        })
    }
}

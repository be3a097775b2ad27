//! Files handed to the isolate tool.

use serde::{Deserialize, Serialize};

/// `<target>.isolate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolateManifest {
    pub variables: IsolateVariables,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolateVariables {
    /// Command run on the bot, relative to the build dir
    pub command: Vec<String>,

    /// Runtime deps plus launcher files, sorted
    pub files: Vec<String>,
}

impl IsolateManifest {
    pub fn new(command: Vec<String>, mut files: Vec<String>) -> Self {
        files.sort();
        Self {
            variables: IsolateVariables { command, files },
        }
    }

    /// Serialize to pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string_pretty(self)? + "\n")
    }
}

/// `<target>.isolated.gen.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenRequest {
    /// Arguments for `isolate.py`
    pub args: Vec<String>,

    /// Source root the isolate paths are relative to
    pub dir: String,

    pub version: u32,
}

impl GenRequest {
    pub fn new(isolated_rel: String, isolate_rel: String, src_root: String) -> Self {
        Self {
            args: vec![
                "--isolated".to_string(),
                isolated_rel,
                "--isolate".to_string(),
                isolate_rel,
            ],
            dir: src_root,
            version: 1,
        }
    }

    /// Serialize to pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string_pretty(self)? + "\n")
    }
}

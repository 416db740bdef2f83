//! Options controlling the shape of the emitted program.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Name of the exported entry function.
    pub function_name: String,
    /// Module the `Runtime` type is imported from.
    pub runtime_import: String,
    /// Emit a `// label [kind] (id)` comment above every node.
    pub emit_comments: bool,
    /// Optional banner placed on the first line.
    pub header: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            function_name: "runWorkflow".into(),
            runtime_import: "./runtime".into(),
            emit_comments: true,
            header: None,
        }
    }
}

impl CompileOptions {
    /// Entry function name, sanitized to a valid identifier.
    pub fn entry_name(&self) -> String {
        let name = crate::resolve::bindings::sanitize_ident(self.function_name.trim());
        if name.is_empty() {
            "runWorkflow".into()
        } else {
            name
        }
    }
}

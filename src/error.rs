//! Diagnostics shared by every compiler phase, plus the hard error for
//! malformed input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Parse,
    Validate,
    Resolve,
    Plan,
    Codegen,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Validate => write!(f, "Validate"),
            Phase::Resolve => write!(f, "Resolve"),
            Phase::Plan => write!(f, "Plan"),
            Phase::Codegen => write!(f, "Codegen"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A structured compile-time message attached to a node or an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub phase: Phase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.phase, self.code, self.message)?;
        if let Some(id) = &self.node_id {
            write!(f, " (node '{}')", id)?;
        }
        if let Some(id) = &self.edge_id {
            write!(f, " (edge '{}')", id)?;
        }
        Ok(())
    }
}

impl Diagnostic {
    fn new(severity: Severity, phase: Phase, code: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code: code.into(),
            phase,
            message: message.into(),
            node_id: None,
            edge_id: None,
        }
    }

    pub fn validate(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            node_id,
            ..Self::new(Severity::Error, Phase::Validate, code, message)
        }
    }

    pub fn validate_warning(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            node_id,
            ..Self::new(Severity::Warning, Phase::Validate, code, message)
        }
    }

    pub fn resolve(code: &str, message: impl Into<String>, node_id: &str) -> Self {
        Diagnostic {
            node_id: Some(node_id.to_string()),
            ..Self::new(Severity::Warning, Phase::Resolve, code, message)
        }
    }

    pub fn plan_info(code: &str, message: impl Into<String>, node_id: &str) -> Self {
        Diagnostic {
            node_id: Some(node_id.to_string()),
            ..Self::new(Severity::Info, Phase::Plan, code, message)
        }
    }

    pub fn plan_warning(code: &str, message: impl Into<String>, node_id: &str) -> Self {
        Diagnostic {
            node_id: Some(node_id.to_string()),
            ..Self::new(Severity::Warning, Phase::Plan, code, message)
        }
    }

    pub fn plan_error(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        Diagnostic {
            node_id,
            ..Self::new(Severity::Error, Phase::Plan, code, message)
        }
    }

    /// Attach the offending edge id.
    pub fn on_edge(mut self, edge_id: impl Into<String>) -> Self {
        self.edge_id = Some(edge_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&CompilerError> for Diagnostic {
    fn from(err: &CompilerError) -> Self {
        Diagnostic::new(Severity::Error, Phase::Parse, "P001", err.to_string())
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Raised only when the input is not a graph at all (bad JSON, missing
/// required fields). Invalid graphs are reported through `Diagnostic`s.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("failed to parse workflow JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse {what}: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::error::Diagnostic;
use crate::{CompileOutput, resolve};

/// Full pipeline: parse → validate → plan → codegen.
/// Returns `{ code, diagnostics }`; malformed JSON becomes a `P001` error.
#[wasm_bindgen]
pub fn compile_workflow(json: &str) -> JsValue {
    let result = crate::compile_json(json).unwrap_or_else(|err| CompileOutput {
        code: String::new(),
        diagnostics: vec![Diagnostic::from(&err)],
    });
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Validate a workflow JSON without planning or emitting.
/// Returns a JSON array of diagnostics (errors and warnings).
#[wasm_bindgen]
pub fn validate_workflow(json: &str) -> JsValue {
    let result = validate_workflow_inner(json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_workflow_inner(json: &str) -> Vec<Diagnostic> {
    let workflow = match crate::parse::parse(json) {
        Ok(w) => w,
        Err(err) => return vec![Diagnostic::from(&err)],
    };
    match crate::validate::validate(&workflow) {
        Ok(validated) => validated.warnings,
        Err(diagnostics) => diagnostics,
    }
}

/// Upstream nodes of `node_id` for the node configuration UI.
/// Returns `null` when the JSON cannot be parsed.
#[wasm_bindgen]
pub fn ancestors(json: &str, node_id: &str) -> JsValue {
    let Ok(workflow) = crate::parse::parse(json) else {
        return JsValue::NULL;
    };
    let result = resolve::ancestors_of(&workflow, node_id);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

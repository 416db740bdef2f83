//! Parse `{{ref}}` placeholders and resolve them against a node's ancestors.
//!
//! Unresolvable placeholders are kept verbatim and reported as warnings, so
//! a half-configured graph still compiles.

use serde::Serialize;

use super::ancestors::{AncestorInfo, INPUT_REF, ancestors_of};
use super::bindings::{BindingNames, property_access};
use crate::error::Diagnostic;
use crate::parse::types::Workflow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplatePart {
    /// Text copied as-is, including placeholders that did not resolve.
    Lit { value: String },
    /// A resolved placeholder and the accessor it became.
    Ref { placeholder: String, accessor: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    /// Text with every resolved placeholder replaced by its accessor.
    pub expression: String,
    pub parts: Vec<TemplatePart>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

impl Resolved {
    pub fn has_refs(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, TemplatePart::Ref { .. }))
    }

    /// The accessor when the whole text is exactly one placeholder.
    pub fn sole_ref(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [TemplatePart::Ref { accessor, .. }] => Some(accessor),
            _ => None,
        }
    }
}

/// Resolve `text` as seen from `node_id`.
///
/// Standalone form: computes the ancestors and binding names itself.
pub fn resolve(text: &str, node_id: &str, workflow: &Workflow) -> Resolved {
    let ancestors = ancestors_of(workflow, node_id);
    let names = BindingNames::build(workflow);
    TemplateResolver::new(node_id, &ancestors, &names).resolve(text)
}

/// Resolves every template of one node against a precomputed ancestor list.
pub struct TemplateResolver<'a> {
    node_id: &'a str,
    ancestors: &'a [AncestorInfo],
    names: &'a BindingNames,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(node_id: &'a str, ancestors: &'a [AncestorInfo], names: &'a BindingNames) -> Self {
        TemplateResolver {
            node_id,
            ancestors,
            names,
        }
    }

    pub fn resolve(&self, text: &str) -> Resolved {
        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut warnings = Vec::new();

        for token in tokenize(text) {
            match token {
                Token::Text(value) => push_lit(&mut parts, value),
                Token::Malformed { raw, unterminated } => {
                    let message = if unterminated {
                        format!("Unterminated placeholder '{}'", raw)
                    } else {
                        format!("Placeholder starting at '{}' contains nested braces", raw)
                    };
                    warnings.push(Diagnostic::resolve("R005", message, self.node_id));
                    push_lit(&mut parts, raw);
                }
                Token::Placeholder { raw, inner } => match self.resolve_ref(inner) {
                    Ok(accessor) => parts.push(TemplatePart::Ref {
                        placeholder: raw.to_string(),
                        accessor,
                    }),
                    Err((code, message)) => {
                        warnings.push(Diagnostic::resolve(code, message, self.node_id));
                        push_lit(&mut parts, raw);
                    }
                },
            }
        }

        let expression = parts
            .iter()
            .map(|p| match p {
                TemplatePart::Lit { value } => value.as_str(),
                TemplatePart::Ref { accessor, .. } => accessor.as_str(),
            })
            .collect();

        Resolved {
            expression,
            parts,
            warnings,
        }
    }

    fn resolve_ref(&self, inner: &str) -> Result<String, (&'static str, String)> {
        let inner = inner.trim();
        let mut segments = inner.split('.');
        let head = segments.next().unwrap_or_default().trim();
        let path: Vec<&str> = segments.collect();

        if head.is_empty() || path.iter().any(|s| s.trim().is_empty()) {
            return Err(("R001", format!("Malformed reference '{{{{{}}}}}'", inner)));
        }

        if head == INPUT_REF {
            let mut accessor = INPUT_REF.to_string();
            for segment in path {
                accessor.push_str(&property_access(segment.trim()));
            }
            return Ok(accessor);
        }

        let Some(ancestor) = self
            .ancestors
            .iter()
            .find(|a| !a.is_input() && a.node_id == head)
        else {
            return Err((
                "R002",
                format!("'{}' is not an upstream node of '{}'", head, self.node_id),
            ));
        };

        let (field, rest) = match path.split_first() {
            Some((field, rest)) => {
                let field = field.trim();
                if !ancestor.fields.iter().any(|f| f == field) {
                    return Err((
                        "R003",
                        format!(
                            "Node '{}' has no output field '{}' (available: {})",
                            head,
                            field,
                            ancestor.fields.join(", ")
                        ),
                    ));
                }
                (field, rest)
            }
            None => match ancestor.fields.as_slice() {
                [only] => (only.as_str(), &[][..]),
                _ => {
                    return Err((
                        "R004",
                        format!(
                            "'{{{{{}}}}}' is ambiguous; reference one of: {}",
                            head,
                            ancestor.fields.join(", ")
                        ),
                    ));
                }
            },
        };

        let mut accessor = self.names.var(head);
        accessor.push_str(&property_access(field));
        for segment in rest {
            accessor.push_str(&property_access(segment.trim()));
        }
        Ok(accessor)
    }
}

fn push_lit(parts: &mut Vec<TemplatePart>, value: &str) {
    if value.is_empty() {
        return;
    }
    if let Some(TemplatePart::Lit { value: last }) = parts.last_mut() {
        last.push_str(value);
    } else {
        parts.push(TemplatePart::Lit {
            value: value.to_string(),
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'t> {
    Text(&'t str),
    Placeholder { raw: &'t str, inner: &'t str },
    Malformed { raw: &'t str, unterminated: bool },
}

/// Brace-matching scan. A `{{` whose body contains another brace is
/// malformed; scanning resumes right after it.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let inner = &after_open[..end];
                if inner.contains(['{', '}']) {
                    tokens.push(Token::Malformed {
                        raw: &rest[start..start + 2],
                        unterminated: false,
                    });
                    rest = after_open;
                } else {
                    tokens.push(Token::Placeholder {
                        raw: &rest[start..start + 2 + end + 2],
                        inner,
                    });
                    rest = &after_open[end + 2..];
                }
            }
            None => {
                tokens.push(Token::Malformed {
                    raw: &rest[start..],
                    unterminated: true,
                });
                return tokens;
            }
        }
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    tokens
}

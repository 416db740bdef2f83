//! Resolved templates and config values → TypeScript expression strings.

use crate::resolve::template::{Resolved, TemplatePart};

/// A string-valued field: the bare accessor when the whole text is one
/// placeholder, a plain string literal when there are no placeholders, a
/// template literal otherwise.
pub fn emit_string(resolved: &Resolved) -> String {
    if let Some(accessor) = resolved.sole_ref() {
        return accessor.to_string();
    }
    if !resolved.has_refs() {
        return string_literal(&resolved.expression);
    }
    emit_template(&resolved.parts)
}

fn emit_template(parts: &[TemplatePart]) -> String {
    let mut out = String::from("`");
    for part in parts {
        match part {
            TemplatePart::Lit { value } => {
                out.push_str(
                    &value
                        .replace('\\', "\\\\")
                        .replace('`', "\\`")
                        .replace("${", "\\${"),
                );
            }
            TemplatePart::Ref { accessor, .. } => {
                out.push_str("${");
                out.push_str(accessor);
                out.push('}');
            }
        }
    }
    out.push('`');
    out
}

/// An expression-valued field (condition, stop condition): placeholders are
/// substituted inline and the rest is copied verbatim.
pub fn emit_expression(resolved: &Resolved) -> String {
    let expr = resolved.expression.trim();
    if expr.is_empty() {
        "false".to_string()
    } else {
        expr.to_string()
    }
}

pub fn string_literal(value: &str) -> String {
    format!("\"{}\"", escape_string(value))
}

/// Object key: bare when it is a plain identifier, quoted otherwise.
pub fn object_key(name: &str) -> String {
    let is_ident = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        name.to_string()
    } else {
        string_literal(name)
    }
}

pub fn string_array(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| string_literal(v)).collect();
    format!("[{}]", items.join(", "))
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

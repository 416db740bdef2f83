//! Cross-node data references: upstream discovery, `{{...}}` resolution and
//! the variable names references resolve to.

pub mod ancestors;
pub mod bindings;
pub mod template;

pub use ancestors::{AncestorInfo, ancestors_of};
pub use bindings::BindingNames;
pub use template::{Resolved, TemplatePart, TemplateResolver, resolve};

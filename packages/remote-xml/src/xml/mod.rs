//! XML helpers: default namespace rewriting, node access and subtree dumps.

mod namespace;
mod node;
mod serialize;

pub use namespace::normalize_default_namespace;
pub use node::{
    first_child_text, get_attribute, get_content, get_tag_name, node_kind, root_element,
    starts_text_run, text_run,
};
pub use serialize::node_to_string;

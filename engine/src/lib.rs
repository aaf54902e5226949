//! The macro execution engine: the parsed document model, reference
//! resolution against its side tables, and command-line construction
//! for the external process runner.

pub mod argument;
pub mod cmdline;
pub mod document;
pub mod node;
pub mod resolver;

pub use crate::{
    argument::{ArgKind, ModuleArgument},
    cmdline::{split_vm_parameters, EngineConfig},
    document::MacroDocument,
    node::MacroNode,
};

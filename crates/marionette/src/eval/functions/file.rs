//! The `file` function: returns the contents of the first path that
//! exists.
//!
//! Relative paths resolve against the directory of the manifest being
//! evaluated.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("file");
    descriptor.add(signature(vec![Type::string()], 1, usize::MAX), file);
    descriptor
}

/// Resolves a path argument against the current manifest's directory.
pub(crate) fn resolve_path(context: &Context<'_>, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_owned();
    }
    match context.current_tree() {
        Some(tree) => Path::new(&tree.path)
            .parent()
            .map_or_else(|| path.to_owned(), |parent| parent.join(path)),
        None => path.to_owned(),
    }
}

fn file(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    for arg in &call.args {
        let Value::String(path) = arg else {
            unreachable!("guarded by the dispatch signature");
        };
        let resolved = resolve_path(context, path);
        if let Ok(contents) = fs::read_to_string(&resolved) {
            return Ok(Value::string(contents));
        }
    }
    Err(call.error("could not find any of the specified files"))
}

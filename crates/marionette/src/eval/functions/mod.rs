//! Built-in functions and the function dispatcher.
//!
//! Each builtin has its own submodule contributing a
//! [`descriptor::FunctionDescriptor`]. User-defined functions from
//! manifests are dispatched by the evaluator before this table is
//! consulted; the fallback hook runs only when no descriptor exists.

pub mod descriptor;

mod assert_type;
mod declare;
mod defined;
mod each;
mod epp;
mod fail;
mod file;
mod filter;
mod log;
mod map;
mod realize;
mod reduce;
mod reverse_each;
mod split;
mod step;
mod tag;
mod tagged;
mod versioncmp;
mod with;

use ahash::AHashMap;

use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
pub use descriptor::{FunctionCallback, FunctionDescriptor};

/// Hook invoked only when no descriptor exists for a called name. A
/// `Some` result becomes the call's value; `None` surfaces the
/// unknown-function error.
pub type FallbackCallback = fn(&mut Context<'_>, &CallContext<'_>) -> EvalResult<Option<Value>>;

use crate::value::Value;

/// The function table.
pub struct FunctionDispatcher {
    table: AHashMap<String, FunctionDescriptor>,
    fallback: Option<FallbackCallback>,
}

impl FunctionDispatcher {
    /// Builds the dispatcher with every built-in function registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut dispatcher = Self {
            table: AHashMap::new(),
            fallback: None,
        };
        for descriptor in log::create_descriptors() {
            dispatcher.register(descriptor);
        }
        for descriptor in declare::create_descriptors() {
            dispatcher.register(descriptor);
        }
        dispatcher.register(assert_type::create_descriptor());
        dispatcher.register(defined::create_descriptor());
        dispatcher.register(each::create_descriptor());
        dispatcher.register(epp::create_descriptor());
        dispatcher.register(epp::create_inline_descriptor());
        dispatcher.register(fail::create_descriptor());
        dispatcher.register(file::create_descriptor());
        dispatcher.register(filter::create_descriptor());
        dispatcher.register(map::create_descriptor());
        dispatcher.register(realize::create_descriptor());
        dispatcher.register(reduce::create_descriptor());
        dispatcher.register(reverse_each::create_descriptor());
        dispatcher.register(split::create_descriptor());
        dispatcher.register(step::create_descriptor());
        dispatcher.register(tag::create_descriptor());
        dispatcher.register(tagged::create_descriptor());
        dispatcher.register(versioncmp::create_descriptor());
        dispatcher.register(with::create_descriptor());
        dispatcher
    }

    fn register(&mut self, descriptor: FunctionDescriptor) {
        self.table.insert(descriptor.name().to_owned(), descriptor);
    }

    /// Installs the fallback hook.
    pub fn set_fallback(&mut self, fallback: FallbackCallback) {
        self.fallback = Some(fallback);
    }

    /// True when a descriptor exists for the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Dispatches a call by name. Unknown names consult the fallback; a
    /// fallback miss (or absence) is the unknown-function error.
    pub fn dispatch(&self, context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
        match self.table.get(call.name) {
            Some(descriptor) => descriptor.dispatch(context, call),
            None => {
                if let Some(fallback) = self.fallback {
                    if let Some(value) = fallback(context, &call)? {
                        return Ok(value);
                    }
                }
                Err(EvaluationError::new(
                    format!("unknown function '{}'", call.name),
                    call.name_span,
                ))
            }
        }
    }
}

//! The logging function family: one function per diagnostic level.
//!
//! Each function joins its arguments with spaces and logs the result at
//! its level, returning `undef`. `err`, `crit`, and `emerg` are the
//! abbreviated names the language uses for error, critical, and
//! emergency.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::logging::Level;
use crate::types::Type;
use crate::value::Value;

const LEVELS: &[(&str, Level)] = &[
    ("debug", Level::Debug),
    ("info", Level::Info),
    ("notice", Level::Notice),
    ("warning", Level::Warning),
    ("err", Level::Error),
    ("alert", Level::Alert),
    ("crit", Level::Critical),
    ("emerg", Level::Emergency),
];

pub(crate) fn create_descriptors() -> Vec<FunctionDescriptor> {
    LEVELS
        .iter()
        .map(|(name, level)| {
            let mut descriptor = FunctionDescriptor::new(*name);
            let callback = match level {
                Level::Debug => log_debug,
                Level::Info => log_info,
                Level::Notice => log_notice,
                Level::Warning => log_warning,
                Level::Error => log_err,
                Level::Alert => log_alert,
                Level::Critical => log_crit,
                Level::Emergency => log_emerg,
            };
            descriptor.add(signature(vec![Type::Any], 0, usize::MAX), callback);
            descriptor
        })
        .collect()
}

/// Joins the call's arguments with single spaces.
pub(crate) fn format_message(call: &CallContext<'_>) -> String {
    let mut message = String::new();
    for (index, arg) in call.args.iter().enumerate() {
        if index > 0 {
            message.push(' ');
        }
        message.push_str(&arg.to_string());
    }
    message
}

fn log(context: &mut Context<'_>, call: &CallContext<'_>, level: Level) -> EvalResult<Value> {
    if context.reporter.enabled(level) {
        let message = format_message(call);
        context.log(level, Some(call.call_span), &message);
    }
    Ok(Value::Undef)
}

fn log_debug(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Debug)
}

fn log_info(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Info)
}

fn log_notice(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Notice)
}

fn log_warning(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Warning)
}

fn log_err(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Error)
}

fn log_alert(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Alert)
}

fn log_crit(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Critical)
}

fn log_emerg(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    log(context, &call, Level::Emergency)
}

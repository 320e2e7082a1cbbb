#![doc = include_str!("../../../README.md")]

pub mod ast;
pub mod catalog;
pub mod compiler;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod logging;
pub mod node;
pub mod parser;
pub mod registry;
pub mod types;
pub mod value;

pub use crate::{
    catalog::{Catalog, Relationship, Resource, ResourceIndex},
    compiler::Compiler,
    error::{CompileError, CycleError, EvaluationError, LexError, ParseError, SourceWarning, StackFrame},
    lexer::position::{LineInfo, Position, Span, line_info},
    logging::{CollectLogger, Diagnostic, Level, Logger, NoLogger, StdLogger},
    node::{Facts, MapFacts, Node},
    registry::Registry,
    types::Type,
    value::Value,
};

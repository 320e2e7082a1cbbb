//! The compilation pipeline.
//!
//! source → lexer → parser → scanner (definition registration) →
//! evaluation (catalog and context mutation) → finalization (pending
//! overrides, collector re-runs, metaparameter edges, cycle check).
//!
//! A compiler is constructed once per manifest and may compile for any
//! number of nodes; each compilation builds a fresh context and catalog.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::ast::SyntaxTree;
use crate::catalog::Catalog;
use crate::error::{CompileError, EvalResult, EvaluationError};
use crate::eval::collector::evaluate_collector;
use crate::eval::context::Context;
use crate::eval::scope::Scope;
use crate::logging::Logger;
use crate::node::{Facts, Node};
use crate::parser;
use crate::registry::NodeDefinition;

/// Compiles manifests into catalogs.
#[derive(Debug)]
pub struct Compiler {
    source: String,
    path: String,
}

impl Compiler {
    /// Creates a compiler for in-memory manifest source.
    #[must_use]
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }

    /// Creates a compiler by reading the manifest from disk.
    pub fn from_file(path: &str) -> Result<Self, CompileError> {
        let source = std::fs::read_to_string(path)
            .map_err(|error| CompileError::bare(&format!("cannot read '{path}': {error}"), path))?;
        Ok(Self {
            source,
            path: path.to_owned(),
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Compiles a catalog for the given node.
    ///
    /// Top-level code evaluates in `Class[main]` (contained by
    /// `Stage[main]`); a matching node definition evaluates in the node
    /// scope before the main body. Finalization validates the dependency
    /// graph before the catalog is returned.
    pub fn compile(
        &self,
        node: Node,
        facts: Rc<dyn Facts>,
        logger: &mut dyn Logger,
    ) -> Result<Catalog, CompileError> {
        let output = parser::parse(&self.source, &self.path)
            .map_err(|error| CompileError::from_parse(&error, &self.source, &self.path))?;
        let tree = Rc::new(output.tree);

        let mut context = Context::new(node, facts, logger);
        let result = context.with_tree(tree.clone(), |context| {
            context.log_source_warnings(&output.warnings);
            self.evaluate(context, &tree)
        });
        match result {
            Ok(()) => {}
            Err(error) => {
                let error = context.attach_frames(error);
                return Err(CompileError::from_evaluation(&error, &self.source, &self.path));
            }
        }

        // A nonzero error count (from err() and friends) aborts at this
        // boundary even though no exception unwound
        if context.reporter.error_count() > 0 {
            return Err(CompileError::bare(
                "compilation failed due to previously reported errors",
                &self.path,
            ));
        }

        match context.catalog.detect_cycles() {
            Ok(()) => Ok(context.catalog),
            Err(cycle) => Err(CompileError::from_cycle(&cycle, &self.path)),
        }
    }

    fn evaluate(&self, context: &mut Context<'_>, tree: &Rc<SyntaxTree>) -> EvalResult<()> {
        context.registry.import(tree)?;

        // The containment roots: Stage[main] and Class[main]
        let stage = context
            .catalog
            .add("stage", "main", None, None, None, &self.path, false)
            .expect("the catalog is empty");
        context.catalog.realize(stage);
        let main = context
            .catalog
            .add("class", "main", Some(stage), Some(context.top_scope()), None, &self.path, false)
            .expect("Class[main] cannot conflict in an empty catalog");
        context.catalog.realize(main);

        // Top-level code evaluates in Class[main]
        let main_scope = Scope::child(context.node_or_top(), Some(main));
        context.with_scope(main_scope, |context| context.evaluate_statements(&tree.statements))?;

        // Then the matching node definition, in the node scope
        if context.registry.has_nodes() {
            let Some((definition, _matched, captures)) = context.registry.find_node(context.node()) else {
                return Err(EvaluationError::without_span(format!(
                    "could not find a default node or a node matching '{}'",
                    context.node().name()
                )));
            };
            let definition: NodeDefinition = definition.clone();
            let node_scope = context.set_node_scope(main);
            context.match_scopes.push();
            if let Some(captures) = captures {
                context.match_scopes.set(SmallVec::from_vec(captures));
            }
            let statement = definition.statement.clone();
            let result = context.with_tree(definition.tree.clone(), |context| {
                context.with_scope(node_scope, |context| {
                    context.evaluate_statements(&statement.body)
                })
            });
            context.match_scopes.pop();
            result?;
        }

        self.finalize(context)
    }

    /// Catalog finalization: re-run collectors for late declarations,
    /// resolve pending overrides, extract metaparameter edges.
    fn finalize(&self, context: &mut Context<'_>) -> EvalResult<()> {
        let collectors = context.collectors.clone();
        for collector in collectors {
            let expression = collector.expression.clone();
            context.with_scope(collector.scope, |context| {
                evaluate_collector(context, &expression).map(|_| ())
            })?;
        }

        let pending = std::mem::take(&mut context.pending_overrides);
        for pending_override in pending {
            match context.catalog.find_by_reference(&pending_override.reference) {
                Some(index) => {
                    context.with_scope(pending_override.scope.clone(), |context| {
                        context.apply_override(index, &pending_override.operations)
                    })?;
                }
                None => {
                    return Err(EvaluationError::new(
                        format!(
                            "resource {} referenced by an override does not exist in the catalog",
                            pending_override.reference
                        ),
                        pending_override.span,
                    ));
                }
            }
        }

        let failures = context.catalog.extract_metaparameter_edges();
        if let Some((_, span, message)) = failures.into_iter().next() {
            return Err(match span {
                Some(span) => EvaluationError::new(message, span),
                None => EvaluationError::without_span(message),
            });
        }
        Ok(())
    }
}

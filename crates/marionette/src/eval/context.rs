//! The evaluation context.
//!
//! Owns everything compilation mutates: the catalog, the registry, the
//! scope and match-scope stacks, call frames, pending overrides, and the
//! two dispatchers. The tree-walking methods live in [`crate::eval`];
//! this module is the plumbing they share.

use std::rc::Rc;

use ahash::AHashMap;

use crate::ast::{AttributeOperation, CollectorExpr, Lambda, SyntaxTree};
use crate::catalog::{Catalog, ResourceIndex};
use crate::error::{EvaluationError, SourceWarning, StackFrame};
use crate::eval::functions::FunctionDispatcher;
use crate::eval::operators::BinaryDispatcher;
use crate::eval::scope::{MatchScopes, Scope, ScopeRef};
use crate::lexer::position::{Span, line_info};
use crate::logging::{Diagnostic, Level, Logger, Reporter};
use crate::node::{Facts, Node};
use crate::registry::Registry;
use crate::types::{AliasType, Type};
use crate::value::Value;

/// A resource override whose target may not exist yet; resolved during
/// finalization.
#[derive(Debug, Clone)]
pub struct PendingOverride {
    pub reference: Type,
    pub operations: Vec<AttributeOperation>,
    pub span: Span,
    /// Scope the override was written in, for evaluating operation values.
    pub scope: ScopeRef,
}

/// A collector registered for (re-)evaluation: the query runs again at
/// finalization so resources declared after the collector still match.
#[derive(Debug, Clone)]
pub struct RegisteredCollector {
    pub expression: Rc<CollectorExpr>,
    pub scope: ScopeRef,
}

/// The mutable state of one compilation.
pub struct Context<'a> {
    node: Node,
    facts: Rc<dyn Facts>,
    pub registry: Registry,
    pub catalog: Catalog,
    scopes: Vec<ScopeRef>,
    top_scope: ScopeRef,
    node_scope: Option<ScopeRef>,
    /// Scopes of evaluated classes, for qualified variable lookup.
    class_scopes: AHashMap<String, ScopeRef>,
    pub match_scopes: MatchScopes,
    frames: Vec<StackFrame>,
    /// Trees currently being evaluated, innermost last; used for
    /// diagnostics and error wrapping.
    trees: Vec<Rc<SyntaxTree>>,
    pub reporter: Reporter<'a>,
    functions: Rc<FunctionDispatcher>,
    operators: Rc<BinaryDispatcher>,
    pub pending_overrides: Vec<PendingOverride>,
    pub collectors: Vec<RegisteredCollector>,
    /// Classes whose declaration is in progress, for inheritance loops.
    declaring: Vec<String>,
}

impl<'a> Context<'a> {
    /// Creates a context for compiling `node` with the given facts,
    /// logging through `logger`.
    pub fn new(node: Node, facts: Rc<dyn Facts>, logger: &'a mut dyn Logger) -> Self {
        let top_scope = Scope::top(facts.clone());
        Self {
            node,
            facts,
            registry: Registry::new(),
            catalog: Catalog::new(),
            scopes: vec![top_scope.clone()],
            top_scope,
            node_scope: None,
            class_scopes: AHashMap::new(),
            match_scopes: MatchScopes::new(),
            frames: Vec::new(),
            trees: Vec::new(),
            reporter: Reporter::new(logger),
            functions: Rc::new(FunctionDispatcher::with_builtins()),
            operators: Rc::new(BinaryDispatcher::with_builtins()),
            pending_overrides: Vec::new(),
            collectors: Vec::new(),
            declaring: Vec::new(),
        }
    }

    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    #[must_use]
    pub fn facts(&self) -> Rc<dyn Facts> {
        self.facts.clone()
    }

    /// The function dispatcher, cloned so callbacks can borrow the context
    /// mutably while dispatching.
    #[must_use]
    pub fn functions(&self) -> Rc<FunctionDispatcher> {
        self.functions.clone()
    }

    /// The binary-operator dispatcher, cloned like [`Self::functions`].
    #[must_use]
    pub fn operators(&self) -> Rc<BinaryDispatcher> {
        self.operators.clone()
    }

    // --- scopes ---

    /// The current (innermost) scope.
    #[must_use]
    pub fn scope(&self) -> ScopeRef {
        self.scopes.last().expect("the scope stack is never empty").clone()
    }

    #[must_use]
    pub fn top_scope(&self) -> ScopeRef {
        self.top_scope.clone()
    }

    /// The node scope if a node definition matched, else the top scope.
    #[must_use]
    pub fn node_or_top(&self) -> ScopeRef {
        self.node_scope.clone().unwrap_or_else(|| self.top_scope.clone())
    }

    /// Establishes the node scope for the remainder of the evaluation.
    pub fn set_node_scope(&mut self, resource: ResourceIndex) -> ScopeRef {
        let scope = Scope::child(self.top_scope.clone(), Some(resource));
        self.node_scope = Some(scope.clone());
        scope
    }

    /// Runs `f` with `scope` pushed as the current scope.
    pub fn with_scope<R>(&mut self, scope: ScopeRef, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Records the scope of an evaluated class for qualified lookups.
    pub fn add_class_scope(&mut self, name: &str, scope: ScopeRef) {
        self.class_scopes.insert(name.to_owned(), scope);
    }

    #[must_use]
    pub fn find_class_scope(&self, name: &str) -> Option<ScopeRef> {
        self.class_scopes.get(name).cloned()
    }

    /// Looks up a variable by (possibly qualified) name:
    /// `x` walks the current scope chain, `::x` reads the top scope,
    /// `cls::x` reads the named class scope, and an all-digit name is a
    /// match variable.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            let index: usize = name.parse().ok()?;
            return self.match_scopes.get(index);
        }
        match name.rsplit_once("::") {
            None => self.scope().borrow().get(name),
            Some(("", variable)) => self.top_scope.borrow().get_local(variable),
            Some((class, variable)) => {
                let scope = self.find_class_scope(&crate::registry::normalize_name(class))?;
                let value = scope.borrow().get_local(variable);
                value
            }
        }
    }

    // --- frames ---

    /// Runs `f` with a call frame pushed; the frame pops on all exit
    /// paths.
    pub fn with_frame<R>(
        &mut self,
        name: &str,
        span: Option<Span>,
        external: bool,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.frames.push(StackFrame {
            name: name.to_owned(),
            span,
            external,
        });
        let result = f(self);
        self.frames.pop();
        result
    }

    /// The current frame stack, outermost first.
    #[must_use]
    pub fn frames(&self) -> Vec<StackFrame> {
        self.frames.clone()
    }

    /// Attaches the current frame stack to an error that lacks one.
    #[must_use]
    pub fn attach_frames(&self, error: EvaluationError) -> EvaluationError {
        error.with_frames(self.frames.clone())
    }

    // --- trees & diagnostics ---

    /// Runs `f` with `tree` as the innermost tree (for diagnostics).
    pub fn with_tree<R>(&mut self, tree: Rc<SyntaxTree>, f: impl FnOnce(&mut Self) -> R) -> R {
        self.trees.push(tree);
        let result = f(self);
        self.trees.pop();
        result
    }

    /// The tree currently being evaluated, if any.
    #[must_use]
    pub fn current_tree(&self) -> Option<Rc<SyntaxTree>> {
        self.trees.last().cloned()
    }

    /// Emits a diagnostic at a span within the current tree.
    pub fn log(&mut self, level: Level, span: Option<Span>, message: &str) {
        if !self.reporter.enabled(level) {
            return;
        }
        match (self.current_tree(), span) {
            (Some(tree), Some(span)) => {
                let info = line_info(&tree.source, span.begin.offset, span.len().max(1));
                self.reporter.log(&Diagnostic {
                    level,
                    message,
                    path: Some(&tree.path),
                    line: span.begin.line,
                    column: info.column,
                    length: info.length,
                    text: Some(&info.text),
                });
            }
            _ => self.reporter.log(&Diagnostic::bare(level, message)),
        }
    }

    /// Emits a warning at a span.
    pub fn warn(&mut self, span: Span, message: &str) {
        self.log(Level::Warning, Some(span), message);
    }

    /// Surfaces buffered lexer/parser warnings through the logger.
    pub fn log_source_warnings(&mut self, warnings: &[SourceWarning]) {
        for warning in warnings {
            self.log(Level::Warning, Some(warning.span), &warning.message);
        }
    }

    // --- registry helpers ---

    /// An alias resolver backed by the registry, for type parsing.
    #[must_use]
    pub fn alias_resolver(&self) -> impl Fn(&str) -> Option<AliasType> + use<'_, 'a> {
        |name: &str| self.registry.find_alias(name)
    }

    /// Marks a class as being declared, for inheritance-loop detection.
    /// Returns false when the class is already on the declaration path.
    pub fn begin_declaring(&mut self, name: &str) -> bool {
        if self.declaring.iter().any(|declaring| declaring == name) {
            return false;
        }
        self.declaring.push(name.to_owned());
        true
    }

    pub fn end_declaring(&mut self) {
        self.declaring.pop();
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("node", &self.node)
            .field("scopes", &self.scopes.len())
            .field("frames", &self.frames.len())
            .field("resources", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

/// The arguments of one function invocation, as the dispatcher sees them.
#[derive(Debug)]
pub struct CallContext<'e> {
    pub name: &'e str,
    pub name_span: Span,
    pub args: Vec<Value>,
    pub arg_spans: Vec<Span>,
    pub lambda: Option<&'e Lambda>,
    pub call_span: Span,
}

impl CallContext<'_> {
    /// The span of argument `index`, falling back to the call span.
    #[must_use]
    pub fn arg_span(&self, index: usize) -> Span {
        self.arg_spans.get(index).copied().unwrap_or(self.call_span)
    }

    /// An evaluation error at the call site.
    #[must_use]
    pub fn error(&self, message: impl Into<std::borrow::Cow<'static, str>>) -> EvaluationError {
        EvaluationError::new(message, self.call_span)
    }
}

//! The tree-walking evaluator.
//!
//! Evaluation methods hang off [`Context`]: statements evaluate in order
//! (the last one in a body is its value), expressions dispatch on the AST
//! variant, and resource forms mutate the catalog. Function calls try
//! manifest-defined functions first, then the builtin dispatcher.

pub mod access;
pub mod collector;
pub mod context;
pub mod functions;
pub mod interpolate;
pub mod operators;
pub mod scope;

use std::rc::Rc;

use crate::ast::{
    AttributeOperation, BinaryExpr, BinaryOp, CaseExpr, Expr, ExprLoc, FunctionCall, IfExpr, Lambda, MethodCall,
    Parameter, ResourceExpr, ResourceType, SelectorExpr, Statement,
};
use crate::catalog::{Attribute, Relationship, ResourceIndex, is_metaparameter};
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context, PendingOverride};
use crate::eval::operators::BinaryContext;
use crate::eval::scope::{Scope, ScopeRef};
use crate::lexer::position::Span;
use crate::registry::{ClassDefinition, normalize_name};
use crate::types::{parse as type_parse, type_of};
use crate::value::{Value, ValueHash, ValueRegex};

impl Context<'_> {
    // --- statements ---

    /// Evaluates a statement sequence; the last statement's value is the
    /// sequence's value.
    pub fn evaluate_statements(&mut self, statements: &[Statement]) -> EvalResult<Value> {
        let mut value = Value::Undef;
        for statement in statements {
            value = self.evaluate_statement(statement)?;
        }
        Ok(value)
    }

    /// Evaluates one statement. Definition statements were registered by
    /// the scanner and evaluate to `undef` here.
    pub fn evaluate_statement(&mut self, statement: &Statement) -> EvalResult<Value> {
        match statement {
            Statement::Class(_)
            | Statement::DefinedType(_)
            | Statement::Node(_)
            | Statement::Function(_)
            | Statement::TypeAlias(_)
            | Statement::Capability(_)
            | Statement::Application(_) => Ok(Value::Undef),
            Statement::Site(site) => {
                self.evaluate_statements(&site.body)?;
                Ok(Value::Undef)
            }
            Statement::Expression(expr) => self
                .evaluate(expr)
                .map_err(|error| error.with_default_span(expr.span)),
            Statement::Break(span) => Err(EvaluationError::break_control(*span)),
        }
    }

    /// Renders an EPP statement list: render-strings concatenate and
    /// render-expressions stringify.
    pub fn render_template(&mut self, statements: &[Statement]) -> EvalResult<Value> {
        let mut rendered = String::new();
        for statement in statements {
            match statement {
                Statement::Expression(expr) => match &expr.expr {
                    Expr::RenderString(text) => rendered.push_str(text),
                    Expr::RenderExpression(inner) => {
                        let value = self.evaluate(inner)?;
                        rendered.push_str(&value.to_string());
                    }
                    _ => {
                        self.evaluate_statement(statement)?;
                    }
                },
                _ => {
                    self.evaluate_statement(statement)?;
                }
            }
        }
        Ok(Value::string(rendered))
    }

    // --- expressions ---

    /// Evaluates an expression to a value.
    pub fn evaluate(&mut self, expr: &ExprLoc) -> EvalResult<Value> {
        match &expr.expr {
            Expr::Undef => Ok(Value::Undef),
            Expr::Default => Ok(Value::Default),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Integer(v) => Ok(Value::Integer(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::String(s) => Ok(Value::string(s.clone())),
            Expr::InterpolatedString(parts) => interpolate::interpolate_parts(self, parts),
            Expr::Heredoc(heredoc) => interpolate::interpolate_heredoc(self, heredoc, expr.span),
            Expr::Regex(pattern) => ValueRegex::new(pattern.clone())
                .map(Value::Regex)
                .map_err(|error| EvaluationError::new(format!("invalid regular expression: {error}"), expr.span)),
            Expr::Name(name) | Expr::BareWord(name) => Ok(Value::string(name.clone())),
            Expr::TypeName(name) => {
                let resolver = self.alias_resolver();
                let base = type_parse::base_type(name, &resolver);
                Ok(Value::Type(base))
            }
            Expr::Variable(name) => Ok(self.lookup(name).unwrap_or(Value::Undef)),
            Expr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    self.evaluate_unfolding(element, &mut values)?;
                }
                Ok(Value::array(values))
            }
            Expr::Hash(pairs) => {
                let mut hash = ValueHash::with_capacity(pairs.len());
                for (key, value) in pairs {
                    hash.insert(self.evaluate(key)?, self.evaluate(value)?);
                }
                Ok(Value::hash(hash))
            }
            Expr::If(if_expr) => self.evaluate_if(if_expr, false),
            Expr::Unless(if_expr) => self.evaluate_if(if_expr, true),
            Expr::Case(case) => self.evaluate_case(case),
            Expr::Selector(selector) => self.evaluate_selector(selector),
            Expr::FunctionCall(call) => self.evaluate_function_call(call, expr.span),
            Expr::MethodCall(call) => self.evaluate_method_call(call, expr.span),
            Expr::Access(access_expr) => {
                let target = self.evaluate(&access_expr.target)?;
                let mut args = Vec::with_capacity(access_expr.args.len());
                for arg in &access_expr.args {
                    self.evaluate_unfolding(arg, &mut args)?;
                }
                access::evaluate_access(self, target, args, access_expr.target.span, expr.span)
            }
            Expr::Binary(binary) => self.evaluate_binary(binary),
            Expr::Negate(operand) => {
                let value = self.evaluate(operand)?;
                match value {
                    Value::Integer(v) => v.checked_neg().map(Value::Integer).ok_or_else(|| {
                        EvaluationError::new(
                            format!("negation of {v} results in an arithmetic overflow"),
                            operand.span,
                        )
                    }),
                    Value::Float(v) => Ok(Value::Float(-v)),
                    other => Err(EvaluationError::new(
                        format!(
                            "expected Numeric for unary '-' but found {}",
                            type_of(&other).generalize()
                        ),
                        operand.span,
                    )),
                }
            }
            Expr::Not(operand) => {
                let value = self.evaluate(operand)?;
                Ok(Value::Boolean(!value.is_truthy()))
            }
            Expr::Splat(operand) => {
                let value = self.evaluate(operand)?;
                Ok(Value::array(value.into_elements(true)))
            }
            Expr::Resource(resource) => self.evaluate_resource(resource, expr.span),
            Expr::ResourceOverride(resource_override) => {
                let reference = self.evaluate(&resource_override.reference)?;
                self.evaluate_override(&reference, &resource_override.operations, expr.span)
            }
            Expr::ResourceDefaults(defaults) => {
                for operation in &defaults.operations {
                    if operation.append {
                        return Err(EvaluationError::new(
                            "the '+>' operator cannot be used in resource defaults",
                            operation.name_span,
                        ));
                    }
                    let attribute = self.evaluate_attribute(operation)?;
                    self.scope()
                        .borrow_mut()
                        .set_default(&defaults.type_name, Rc::new(attribute));
                }
                Ok(Value::Undef)
            }
            Expr::Collector(collector_expr) => {
                let matched = collector::evaluate_collector(self, collector_expr)?;
                self.collectors.push(crate::eval::context::RegisteredCollector {
                    expression: Rc::new(collector_expr.as_ref().clone()),
                    scope: self.scope(),
                });
                Ok(Value::array(
                    matched
                        .into_iter()
                        .map(|index| Value::Type(self.catalog.get(index).reference()))
                        .collect(),
                ))
            }
            Expr::RenderString(text) => Ok(Value::string(text.clone())),
            Expr::RenderExpression(inner) => {
                let value = self.evaluate(inner)?;
                Ok(Value::string(value.to_string()))
            }
        }
    }

    /// Evaluates an expression into an argument list, unfolding a splat
    /// operand into multiple values.
    fn evaluate_unfolding(&mut self, expr: &ExprLoc, into: &mut Vec<Value>) -> EvalResult<()> {
        if let Expr::Splat(operand) = &expr.expr {
            let value = self.evaluate(operand)?;
            into.extend(value.into_elements(true));
            return Ok(());
        }
        into.push(self.evaluate(expr)?);
        Ok(())
    }

    // --- control flow ---

    fn evaluate_if(&mut self, if_expr: &IfExpr, unless: bool) -> EvalResult<Value> {
        self.match_scopes.push();
        let result = self.evaluate_if_inner(if_expr, unless);
        self.match_scopes.pop();
        result
    }

    fn evaluate_if_inner(&mut self, if_expr: &IfExpr, unless: bool) -> EvalResult<Value> {
        let condition = self.evaluate(&if_expr.condition)?.is_truthy() != unless;
        if condition {
            return self.evaluate_statements(&if_expr.body);
        }
        for (elsif_condition, elsif_body) in &if_expr.elsifs {
            if self.evaluate(elsif_condition)?.is_truthy() {
                return self.evaluate_statements(elsif_body);
            }
        }
        match &if_expr.else_body {
            Some(body) => self.evaluate_statements(body),
            None => Ok(Value::Undef),
        }
    }

    fn evaluate_case(&mut self, case: &CaseExpr) -> EvalResult<Value> {
        self.match_scopes.push();
        let result = self.evaluate_case_inner(case);
        self.match_scopes.pop();
        result
    }

    fn evaluate_case_inner(&mut self, case: &CaseExpr) -> EvalResult<Value> {
        let control = self.evaluate(&case.expression)?;
        let mut default_body = None;
        for proposition in &case.propositions {
            for option in &proposition.options {
                if matches!(option.expr, Expr::Default) {
                    default_body = Some(&proposition.body);
                    continue;
                }
                let option_value = self.evaluate(option)?;
                if self.values_match(&control, &option_value) {
                    return self.evaluate_statements(&proposition.body);
                }
            }
        }
        match default_body {
            Some(body) => self.evaluate_statements(body),
            None => Ok(Value::Undef),
        }
    }

    fn evaluate_selector(&mut self, selector: &SelectorExpr) -> EvalResult<Value> {
        self.match_scopes.push();
        let result = self.evaluate_selector_inner(selector);
        self.match_scopes.pop();
        result
    }

    fn evaluate_selector_inner(&mut self, selector: &SelectorExpr) -> EvalResult<Value> {
        let control = self.evaluate(&selector.target)?;
        let mut default_value = None;
        for (option, value) in &selector.cases {
            if matches!(option.expr, Expr::Default) {
                default_value = Some(value);
                continue;
            }
            let option_value = self.evaluate(option)?;
            if self.values_match(&control, &option_value) {
                return self.evaluate(value);
            }
        }
        match default_value {
            Some(value) => self.evaluate(value),
            None => Err(EvaluationError::new(
                format!("no matching selector option for value {control}"),
                selector.target.span,
            )),
        }
    }

    /// Case/selector option matching: regexes match strings (populating
    /// the match scope), types test instances, anything else compares
    /// with language equality.
    fn values_match(&mut self, control: &Value, option: &Value) -> bool {
        match option {
            Value::Regex(regex) => match control {
                Value::String(subject) => match regex.pattern().captures(subject) {
                    Some(captures) => {
                        let groups = captures
                            .iter()
                            .map(|group| group.map(|m| m.as_str().to_owned()))
                            .collect();
                        self.match_scopes.set(groups);
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            Value::Type(t) => t.instance_of(control),
            other => control.equals(other),
        }
    }

    // --- operators ---

    fn evaluate_binary(&mut self, binary: &BinaryExpr) -> EvalResult<Value> {
        match binary.op {
            BinaryOp::Assign => {
                let value = self.evaluate(&binary.right)?;
                self.assign(&binary.left, value)
            }
            BinaryOp::And => {
                let left = self.evaluate(&binary.left)?;
                if !left.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                let right = self.evaluate(&binary.right)?;
                Ok(Value::Boolean(right.is_truthy()))
            }
            BinaryOp::Or => {
                let left = self.evaluate(&binary.left)?;
                if left.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                let right = self.evaluate(&binary.right)?;
                Ok(Value::Boolean(right.is_truthy()))
            }
            op => {
                let left = self.evaluate(&binary.left)?;
                let right = self.evaluate(&binary.right)?;
                let operands = BinaryContext {
                    left,
                    right,
                    left_span: binary.left.span,
                    right_span: binary.right.span,
                    op_span: binary.op_span,
                };
                let operators = self.operators();
                operators
                    .dispatch(self, op, operands)
                    .unwrap_or_else(|| {
                        Err(EvaluationError::new(
                            format!("operator '{op}' is not implemented"),
                            binary.op_span,
                        ))
                    })
            }
        }
    }

    /// Assignment: the left side must be a variable or an array of
    /// variables. An array left side takes an array right side by
    /// position or a hash right side by variable name.
    fn assign(&mut self, left: &ExprLoc, value: Value) -> EvalResult<Value> {
        match &left.expr {
            Expr::Variable(name) => {
                self.assign_variable(name, value.clone(), left.span)?;
                Ok(value)
            }
            Expr::Array(elements) => {
                let mut names = Vec::with_capacity(elements.len());
                for element in elements {
                    match &element.expr {
                        Expr::Variable(name) => names.push((name.clone(), element.span)),
                        _ => {
                            return Err(EvaluationError::new(
                                "expected a variable in the assignment list",
                                element.span,
                            ));
                        }
                    }
                }
                match &value {
                    Value::Array(values) => {
                        if values.len() != names.len() {
                            return Err(EvaluationError::new(
                                format!(
                                    "expected {} elements for assignment but found {}",
                                    names.len(),
                                    values.len()
                                ),
                                left.span,
                            ));
                        }
                        for ((name, span), element) in names.iter().zip(values.iter()) {
                            self.assign_variable(name, element.clone(), *span)?;
                        }
                    }
                    Value::Hash(hash) => {
                        for (name, span) in &names {
                            let Some(element) = hash.get(&Value::string(name.clone())) else {
                                return Err(EvaluationError::new(
                                    format!("the hash being assigned has no key '{name}'"),
                                    *span,
                                ));
                            };
                            self.assign_variable(name, element.clone(), *span)?;
                        }
                    }
                    other => {
                        return Err(EvaluationError::new(
                            format!(
                                "expected Array or Hash for multiple assignment but found {}",
                                type_of(other).generalize()
                            ),
                            left.span,
                        ));
                    }
                }
                Ok(value)
            }
            _ => Err(EvaluationError::new(
                "illegal assignment: the left operand must be a variable",
                left.span,
            )),
        }
    }

    fn assign_variable(&mut self, name: &str, value: Value, span: Span) -> EvalResult<()> {
        if name.contains("::") || name.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EvaluationError::new(
                format!("cannot assign to variable '${name}': assignment requires a local name"),
                span,
            ));
        }
        // Fact names may never be rebound, in any scope
        if self.top_scope().borrow().is_fact(name) {
            return Err(EvaluationError::new(
                format!("cannot assign to variable '${name}': the name is a fact or node parameter"),
                span,
            ));
        }
        let scope = self.scope();
        let result = scope.borrow_mut().set(name.to_owned(), value, span);
        match result {
            Ok(()) => Ok(()),
            Err(Some(previous)) => Err(EvaluationError::new(
                format!(
                    "cannot assign to variable '${name}': the variable was previously assigned at line {}",
                    previous.begin.line
                ),
                span,
            )),
            Err(None) => Err(EvaluationError::new(
                format!("cannot assign to variable '${name}': the name is a fact or node parameter"),
                span,
            )),
        }
    }

    // --- calls ---

    fn evaluate_function_call(&mut self, call: &FunctionCall, span: Span) -> EvalResult<Value> {
        let mut args = Vec::with_capacity(call.args.len());
        let mut arg_spans = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            arg_spans.push(arg.span);
            self.evaluate_unfolding(arg, &mut args)?;
        }
        self.call_function(&call.name, call.name_span, args, arg_spans, call.lambda.as_ref(), span)
    }

    fn evaluate_method_call(&mut self, call: &MethodCall, span: Span) -> EvalResult<Value> {
        let target = self.evaluate(&call.target)?;

        // `Type.new(...)` is conversion, not a prefixed function call
        if call.name == "new" {
            if let Value::Type(t) = &target {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    self.evaluate_unfolding(arg, &mut args)?;
                }
                return access::new_instance(t, &args, span);
            }
        }

        let mut args = vec![target];
        let mut arg_spans = vec![call.target.span];
        for arg in &call.args {
            arg_spans.push(arg.span);
            self.evaluate_unfolding(arg, &mut args)?;
        }
        self.call_function(&call.name, call.name_span, args, arg_spans, call.lambda.as_ref(), span)
    }

    /// Calls a function by name: a manifest-defined function wins over a
    /// builtin of the same name.
    pub fn call_function(
        &mut self,
        name: &str,
        name_span: Span,
        args: Vec<Value>,
        arg_spans: Vec<Span>,
        lambda: Option<&Lambda>,
        call_span: Span,
    ) -> EvalResult<Value> {
        if let Some(definition) = self.registry.find_function(name).cloned() {
            if lambda.is_some() {
                return Err(EvaluationError::new(
                    format!("function '{name}' does not accept a block"),
                    call_span,
                ));
            }
            let scope = Scope::child(self.top_scope(), None);
            self.bind_positional_parameters(&definition.statement.parameters, args, &arg_spans, &scope, name)?;
            let statement = definition.statement.clone();
            let tree = definition.tree.clone();
            return self.with_frame(name, Some(call_span), false, |context| {
                context.with_tree(tree, |context| {
                    context.with_scope(scope, |context| context.evaluate_statements(&statement.body))
                })
            });
        }

        let call = CallContext {
            name,
            name_span,
            args,
            arg_spans,
            lambda,
            call_span,
        };
        let functions = self.functions();
        let result = functions.dispatch(self, call);
        result.map_err(|error| self.attach_frames(error))
    }

    /// Invokes a lambda with positional arguments.
    pub fn yield_lambda(&mut self, lambda: &Lambda, args: Vec<Value>) -> EvalResult<Value> {
        let scope = Scope::child(self.scope(), None);
        let spans: Vec<Span> = lambda.parameters.iter().map(|parameter| parameter.name_span).collect();
        self.bind_positional_parameters(&lambda.parameters, args, &spans, &scope, "<block>")?;
        self.with_scope(scope, |context| context.evaluate_statements(&lambda.body))
    }

    /// Binds positional arguments to a parameter list: type checks apply,
    /// defaults fill missing trailing arguments, and a `*$rest` parameter
    /// collects the excess.
    fn bind_positional_parameters(
        &mut self,
        parameters: &[Parameter],
        args: Vec<Value>,
        arg_spans: &[Span],
        scope: &ScopeRef,
        context_name: &str,
    ) -> EvalResult<()> {
        let captures_rest = parameters.last().is_some_and(|parameter| parameter.captures_rest);
        let fixed = if captures_rest { parameters.len() - 1 } else { parameters.len() };
        if args.len() > fixed && !captures_rest {
            return Err(EvaluationError::new(
                format!(
                    "'{context_name}' expects at most {fixed} arguments but was given {}",
                    args.len()
                ),
                arg_spans.first().copied().unwrap_or_default(),
            ));
        }

        let mut args = args.into_iter();
        for (index, parameter) in parameters.iter().take(fixed).enumerate() {
            let value = match args.next() {
                Some(value) => value,
                None => match &parameter.default {
                    Some(default) => self.with_scope(scope.clone(), |context| context.evaluate(default))?,
                    None => {
                        return Err(EvaluationError::new(
                            format!("parameter '${}' is required but no value was given", parameter.name),
                            parameter.name_span,
                        ));
                    }
                },
            };
            self.check_parameter_type(parameter, &value, arg_spans.get(index).copied())?;
            scope
                .borrow_mut()
                .set(parameter.name.clone(), value, parameter.name_span)
                .ok();
        }
        if captures_rest {
            let rest: Vec<Value> = args.collect();
            let parameter = parameters.last().expect("captures_rest implies a parameter");
            scope
                .borrow_mut()
                .set(parameter.name.clone(), Value::array(rest), parameter.name_span)
                .ok();
        }
        Ok(())
    }

    /// Validates a value against a parameter's type annotation.
    fn check_parameter_type(&mut self, parameter: &Parameter, value: &Value, span: Option<Span>) -> EvalResult<()> {
        let Some(type_expr) = &parameter.type_expr else {
            return Ok(());
        };
        let resolver = self.alias_resolver();
        let expected = type_parse::type_from_expression(type_expr, &resolver)?;
        if expected.instance_of(value) {
            return Ok(());
        }
        Err(EvaluationError::new(
            format!(
                "parameter '${}' expects a value of type {expected} but was given {}",
                parameter.name,
                type_of(value).generalize()
            ),
            span.unwrap_or(parameter.name_span),
        ))
    }

    // --- classes and resources ---

    /// Declares a class by name, evaluating its body at most once; a
    /// second declaration reuses the existing resource.
    pub fn declare_class(&mut self, name: &str, span: Span) -> EvalResult<ResourceIndex> {
        self.declare_class_with(name, span, &[])
    }

    /// Declares a class with attribute operations from a resource-form
    /// declaration.
    pub fn declare_class_with(
        &mut self,
        name: &str,
        span: Span,
        operations: &[AttributeOperation],
    ) -> EvalResult<ResourceIndex> {
        let name = normalize_name(name);
        if let Some(existing) = self.catalog.find("Class", &name) {
            if !operations.is_empty() {
                return Err(EvaluationError::new(
                    format!("class '{name}' has already been declared"),
                    span,
                ));
            }
            return Ok(existing);
        }

        let definitions = self
            .registry
            .find_class(&name)
            .map(<[ClassDefinition]>::to_vec)
            .ok_or_else(|| EvaluationError::new(format!("class '{name}' has not been defined"), span))?;
        // With multiple registrations, the first definition supplies the
        // body evaluated here
        let definition = definitions[0].clone();

        if !self.begin_declaring(&name) {
            return Err(EvaluationError::new(
                format!("class '{name}' is involved in a circular dependency while being evaluated"),
                span,
            ));
        }
        let result = self.declare_class_definition(&name, &definition, span, operations);
        self.end_declaring();
        result
    }

    fn declare_class_definition(
        &mut self,
        name: &str,
        definition: &ClassDefinition,
        span: Span,
        operations: &[AttributeOperation],
    ) -> EvalResult<ResourceIndex> {
        // The inherited parent is declared first; its scope becomes this
        // class's parent scope
        let parent_scope = match &definition.statement.parent {
            Some((parent_name, parent_span)) => {
                let parent_index = self.declare_class(parent_name, *parent_span)?;
                let parent_scope = self
                    .find_class_scope(&normalize_name(parent_name))
                    .unwrap_or_else(|| self.node_or_top());
                Some((parent_index, parent_scope))
            }
            None => None,
        };

        let container = self.scope().borrow().resource();
        let index = self
            .catalog
            .add(
                "class",
                name,
                container,
                None,
                Some(definition.statement.name_span),
                &definition.tree.path,
                false,
            )
            .map_err(|_| EvaluationError::new(format!("class '{name}' has already been declared"), span))?;
        self.catalog.realize(index);

        let scope_parent = match &parent_scope {
            Some((parent_index, parent_scope)) => {
                // The child class depends on its parent
                self.catalog.add_edge(*parent_index, index, Relationship::Require);
                parent_scope.clone()
            }
            None => self.node_or_top(),
        };
        let scope = Scope::child(scope_parent, Some(index));
        self.add_class_scope(name, scope.clone());

        // Evaluate explicit attributes: metaparameters attach to the
        // resource, the rest become parameter values
        let mut arguments = ValueHash::default();
        for operation in operations {
            if operation.append {
                return Err(EvaluationError::new(
                    "the '+>' operator cannot be used in a class declaration",
                    operation.name_span,
                ));
            }
            let attribute = self.evaluate_attribute(operation)?;
            if is_metaparameter(&attribute.name) {
                self.catalog.get_mut(index).set(Rc::new(attribute));
            } else {
                arguments.insert(Value::string(attribute.name.clone()), attribute.value.clone());
                self.catalog.get_mut(index).set(Rc::new(attribute));
            }
        }

        let statement = definition.statement.clone();
        let tree = definition.tree.clone();
        self.with_frame(name, Some(span), false, |context| {
            context.with_tree(tree, |context| {
                context.bind_named_parameters(&statement.parameters, &arguments, &scope, name, index)?;
                scope
                    .borrow_mut()
                    .set("title".to_owned(), Value::string(name), statement.name_span)
                    .ok();
                scope
                    .borrow_mut()
                    .set("name".to_owned(), Value::string(name), statement.name_span)
                    .ok();
                context.with_scope(scope.clone(), |context| context.evaluate_statements(&statement.body))
            })
        })?;
        Ok(index)
    }

    /// Binds named arguments (resource attributes) to a parameter list,
    /// evaluating defaults for anything not supplied, and records each
    /// parameter value as an attribute for the catalog projection.
    fn bind_named_parameters(
        &mut self,
        parameters: &[Parameter],
        arguments: &ValueHash,
        scope: &ScopeRef,
        context_name: &str,
        resource: ResourceIndex,
    ) -> EvalResult<()> {
        for parameter in parameters {
            let value = match arguments.get(&Value::string(parameter.name.clone())) {
                Some(value) => value.clone(),
                None => match &parameter.default {
                    Some(default) => self.with_scope(scope.clone(), |context| context.evaluate(default))?,
                    None => {
                        return Err(EvaluationError::new(
                            format!(
                                "parameter '${}' is required by '{context_name}' but no value was given",
                                parameter.name
                            ),
                            parameter.name_span,
                        ));
                    }
                },
            };
            self.check_parameter_type(parameter, &value, None)?;
            if self.catalog.get(resource).get(&parameter.name).is_none() && !value.is_undef() {
                self.catalog.get_mut(resource).set(Rc::new(Attribute::new(
                    parameter.name.clone(),
                    parameter.name_span,
                    value.clone(),
                    parameter.name_span,
                )));
            }
            scope
                .borrow_mut()
                .set(parameter.name.clone(), value, parameter.name_span)
                .ok();
        }

        // Unknown arguments are errors
        for key in arguments.keys() {
            let name = key.as_string().unwrap_or_default();
            if !parameters.iter().any(|parameter| parameter.name == name) && !is_metaparameter(name) {
                return Err(EvaluationError::without_span(format!(
                    "'{name}' is not a parameter of '{context_name}'"
                )));
            }
        }
        Ok(())
    }

    // --- resource expressions ---

    fn evaluate_resource(&mut self, resource: &ResourceExpr, span: Span) -> EvalResult<Value> {
        // A `default:` body contributes operations to every other body in
        // the same declaration
        let mut declaration_defaults: Vec<AttributeOperation> = Vec::new();
        for body in &resource.bodies {
            if matches!(body.title.expr, Expr::Default) {
                declaration_defaults.extend(body.operations.iter().cloned());
            }
        }

        let mut references = Vec::new();
        for body in &resource.bodies {
            if matches!(body.title.expr, Expr::Default) {
                continue;
            }
            let title_value = self.evaluate(&body.title)?;
            let titles = match title_value {
                Value::Array(elements) => elements.as_ref().clone(),
                other => vec![other],
            };
            for title in titles {
                let Value::String(title) = title else {
                    return Err(EvaluationError::new(
                        format!(
                            "expected String for resource title but found {}",
                            type_of(&title).generalize()
                        ),
                        body.title.span,
                    ));
                };
                if title.is_empty() {
                    return Err(EvaluationError::new("resource title cannot be empty", body.title.span));
                }
                let mut operations = declaration_defaults.clone();
                operations.extend(body.operations.iter().cloned());
                let reference =
                    self.declare_resource(resource, &title, &operations, body.title.span, span)?;
                references.push(reference);
            }
        }

        if references.len() == 1 {
            Ok(references.pop().expect("just checked"))
        } else {
            Ok(Value::array(references))
        }
    }

    fn declare_resource(
        &mut self,
        resource: &ResourceExpr,
        title: &str,
        operations: &[AttributeOperation],
        title_span: Span,
        span: Span,
    ) -> EvalResult<Value> {
        let type_name = match &resource.resource_type {
            ResourceType::Class => {
                if !matches!(resource.status, crate::ast::ResourceStatus::Realized) {
                    return Err(EvaluationError::new(
                        "classes cannot be virtual or exported resources",
                        resource.type_span,
                    ));
                }
                let index = self.declare_class_with(title, title_span, operations)?;
                return Ok(Value::Type(self.catalog.get(index).reference()));
            }
            ResourceType::Name(name) => name.clone(),
        };

        let exported = matches!(resource.status, crate::ast::ResourceStatus::Exported);
        let virtual_ = !matches!(resource.status, crate::ast::ResourceStatus::Realized);

        let path = self.current_tree().map(|tree| tree.path.clone()).unwrap_or_default();
        let container = self.scope().borrow().resource();
        let index = self
            .catalog
            .add(
                &type_name,
                title,
                container,
                Some(self.scope()),
                Some(title_span),
                &path,
                exported,
            )
            .map_err(|existing| {
                let existing = self.catalog.get(existing);
                let previous = existing.span().map(|span| span.begin.line).unwrap_or_default();
                EvaluationError::new(
                    format!(
                        "resource {} was previously declared at {}:{previous}",
                        existing.reference(),
                        existing.path(),
                    ),
                    title_span,
                )
            })?;

        for operation in operations {
            let attribute = self.evaluate_attribute(operation)?;
            if operation.append {
                self.catalog
                    .get_mut(index)
                    .append(attribute)
                    .map_err(|message| EvaluationError::new(message, operation.name_span))?;
            } else {
                self.catalog.get_mut(index).set(Rc::new(attribute));
            }
        }

        if !virtual_ {
            self.catalog.realize(index);
        }

        // A defined type evaluates fresh for every declaration
        if let Some(definition) = self.registry.find_defined_type(&type_name).cloned() {
            let scope = Scope::child(self.node_or_top(), Some(index));
            let mut arguments = ValueHash::default();
            let declared = self.catalog.get(index);
            let mut attribute_values: Vec<(String, Value)> = Vec::new();
            declared.each_attribute(&mut |attribute| {
                attribute_values.push((attribute.name.clone(), attribute.value.clone()));
            });
            for (name, value) in attribute_values {
                if !is_metaparameter(&name) {
                    arguments.insert(Value::string(name), value);
                }
            }
            let statement = definition.statement.clone();
            let tree = definition.tree.clone();
            self.with_frame(&definition.name, Some(span), false, |context| {
                context.with_tree(tree, |context| {
                    context.bind_named_parameters(
                        &statement.parameters,
                        &arguments,
                        &scope,
                        &definition.name,
                        index,
                    )?;
                    scope
                        .borrow_mut()
                        .set("title".to_owned(), Value::string(title), statement.name_span)
                        .ok();
                    scope
                        .borrow_mut()
                        .set("name".to_owned(), Value::string(title), statement.name_span)
                        .ok();
                    context.with_scope(scope.clone(), |context| context.evaluate_statements(&statement.body))
                })
            })?;
        }

        Ok(Value::Type(self.catalog.get(index).reference()))
    }

    /// Evaluates one attribute operation into an attribute record.
    pub fn evaluate_attribute(&mut self, operation: &AttributeOperation) -> EvalResult<Attribute> {
        let value = self.evaluate(&operation.value)?;
        Ok(Attribute::new(
            operation.name.clone(),
            operation.name_span,
            value,
            operation.value.span,
        ))
    }

    /// Applies override operations to a reference (or array of
    /// references). Targets that do not exist yet become pending
    /// overrides resolved at finalization.
    fn evaluate_override(
        &mut self,
        reference: &Value,
        operations: &[AttributeOperation],
        span: Span,
    ) -> EvalResult<Value> {
        let mut references = Vec::new();
        crate::catalog::each_reference(reference, &mut |found| references.push(found));
        if references.is_empty() {
            return Err(EvaluationError::new(
                format!(
                    "expected a resource reference for override but found {}",
                    type_of(reference).generalize()
                ),
                span,
            ));
        }
        for target in references {
            match self.catalog.find_by_reference(&target) {
                Some(index) => self.apply_override(index, operations)?,
                None => {
                    let pending = PendingOverride {
                        reference: target,
                        operations: operations.to_vec(),
                        span,
                        scope: self.scope(),
                    };
                    self.pending_overrides.push(pending);
                }
            }
        }
        Ok(reference.clone())
    }

    /// Applies evaluated override operations to a catalog resource.
    /// `attr => undef` removes the attribute.
    pub fn apply_override(&mut self, index: ResourceIndex, operations: &[AttributeOperation]) -> EvalResult<()> {
        for operation in operations {
            let attribute = self.evaluate_attribute(operation)?;
            if operation.append {
                self.catalog
                    .get_mut(index)
                    .append(attribute)
                    .map_err(|message| EvaluationError::new(message, operation.name_span))?;
            } else if attribute.value.is_undef() {
                self.catalog.get_mut(index).unset(&attribute.name);
            } else {
                self.catalog.get_mut(index).set(Rc::new(attribute));
            }
        }
        Ok(())
    }
}

//! Tag processors and the registry that maps tag names to them.
//!
//! Processors are stateless. The registry is built once at startup and never
//! mutated afterwards; share it behind an `Arc`.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::expr::{self, ExprError};
use crate::model::{ParameterMap, ParameterType, QuestionParameter};
use crate::tag_parser::scan_spans;

/// Handler for one inline tag name.
pub trait TagProcessor: Send + Sync {
    /// The tag name this processor is registered under (e.g. `QParam`).
    fn name(&self) -> &str;

    /// Produce the display string for a span's inner content. Must not fail:
    /// anything that cannot be resolved comes back as `inner` unchanged.
    fn process(&self, inner: &str, context: &ParameterMap) -> String;

    /// Inner contents of every occurrence of this processor's tag in `text`.
    fn extract(&self, text: &str) -> Vec<String> {
        scan_spans(text)
            .into_iter()
            .filter(|span| span.name == self.name())
            .map(|span| span.inner.to_string())
            .collect()
    }

    /// Check `inner` against the declared parameters.
    fn validate(
        &self,
        inner: &str,
        parameters: &[QuestionParameter],
    ) -> Result<(), ValidationError>;
}

// ---------------------------------------------------------------------------
// QParam
// ---------------------------------------------------------------------------

/// `<QParam>name</QParam>`: echoes the value assigned to `name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QParamTag;

impl TagProcessor for QParamTag {
    fn name(&self) -> &str {
        "QParam"
    }

    fn process(&self, inner: &str, context: &ParameterMap) -> String {
        match context.get(inner.trim()) {
            Some(value) => value.to_string(),
            None => {
                tracing::debug!(parameter = inner, "no value assigned, leaving reference as-is");
                inner.to_string()
            }
        }
    }

    fn validate(
        &self,
        inner: &str,
        parameters: &[QuestionParameter],
    ) -> Result<(), ValidationError> {
        let name = inner.trim();
        if parameters.iter().any(|p| p.name == name) {
            Ok(())
        } else {
            Err(ValidationError::UnknownParameter(name.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// NumExpr / NumExprTex
// ---------------------------------------------------------------------------

/// Parse `expression` and require every free variable to be a declared
/// number parameter. Built-in constants are allowed when not shadowed.
pub(crate) fn validate_expression(
    expression: &str,
    parameters: &[QuestionParameter],
) -> Result<(), ValidationError> {
    let parsed = expr::parse(expression).map_err(|e| malformed(expression, e))?;

    for variable in parsed.variables() {
        match parameters.iter().find(|p| p.name == variable) {
            Some(p) if p.kind == ParameterType::Number => {}
            Some(_) => {
                return Err(ValidationError::NonNumericParameter {
                    expression: expression.to_string(),
                    variable: variable.to_string(),
                })
            }
            None if expr::constant(variable).is_some() => {}
            None => return Err(ValidationError::UnknownParameter(variable.to_string())),
        }
    }

    Ok(())
}

/// Replace every `QParam` span in `text` with the bare name it references,
/// so the result can be parsed as an expression over parameter names.
/// Other tags are left as written.
pub(crate) fn inline_param_names(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in scan_spans(text) {
        if span.name != QParamTag.name() {
            continue;
        }
        out.push_str(&text[last..span.range.start]);
        out.push_str(span.inner.trim());
        last = span.range.end;
    }
    out.push_str(&text[last..]);
    out
}

fn malformed(expression: &str, error: ExprError) -> ValidationError {
    ValidationError::MalformedExpression {
        expression: expression.to_string(),
        reason: error.to_string(),
    }
}

/// `<NumExpr>a * b + 1</NumExpr>`: evaluates to a number.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumExprTag;

impl TagProcessor for NumExprTag {
    fn name(&self) -> &str {
        "NumExpr"
    }

    fn process(&self, inner: &str, context: &ParameterMap) -> String {
        match expr::evaluate(inner, context) {
            Ok(value) => expr::format_number(value),
            Err(e) => {
                tracing::debug!(expression = inner, error = %e, "expression left unevaluated");
                inner.to_string()
            }
        }
    }

    fn validate(
        &self,
        inner: &str,
        parameters: &[QuestionParameter],
    ) -> Result<(), ValidationError> {
        validate_expression(inner, parameters)
    }
}

/// `<NumExprTex>a^b</NumExprTex>`: the expression as TeX with parameter
/// values substituted, not evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumExprTexTag;

impl TagProcessor for NumExprTexTag {
    fn name(&self) -> &str {
        "NumExprTex"
    }

    fn process(&self, inner: &str, context: &ParameterMap) -> String {
        match expr::parse(inner) {
            Ok(parsed) => parsed.to_tex(&|name| context.get(name).map(|v| v.to_string())),
            Err(e) => {
                tracing::debug!(expression = inner, error = %e, "expression left as written");
                inner.to_string()
            }
        }
    }

    fn validate(
        &self,
        inner: &str,
        parameters: &[QuestionParameter],
    ) -> Result<(), ValidationError> {
        validate_expression(inner, parameters)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable mapping from tag name to processor.
#[derive(Default)]
pub struct TagRegistry {
    processors: BTreeMap<String, Box<dyn TagProcessor>>,
}

impl TagRegistry {
    /// An empty registry: every tag is plain text.
    pub fn new() -> Self {
        Self::default()
    }

    /// `QParam`, `NumExpr`, and `NumExprTex`.
    pub fn standard() -> Self {
        Self::new()
            .with(QParamTag)
            .with(NumExprTag)
            .with(NumExprTexTag)
    }

    /// Register a processor under its own name, replacing any previous one.
    pub fn with<P: TagProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors
            .insert(processor.name().to_string(), Box::new(processor));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn TagProcessor> {
        self.processors.get(name).map(|p| p.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TagProcessor> {
        self.processors.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl std::fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

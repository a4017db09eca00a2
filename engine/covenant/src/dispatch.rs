//! Clause dispatch for compiled contracts.
//!
//! A compiled clause is a pure function from a context record to a sum:
//! `Left(response)` on success, `Right(error)` on a domain failure. A
//! [`Contract`] tries each clause's request types against the incoming
//! request with [`SubtypeRegistry::cast`] and runs the first match.

use std::sync::Arc;

use crate::error::{CovenantError, CovenantResult};
use crate::record::dot;
use crate::registry::SubtypeRegistry;
use crate::sum;
use crate::value::{mismatch, Branded, Record, Sum, Value};

/// Nominal type of the error payloads carried in the Right arm.
pub const ERROR_TYPE: &str = "Error";

pub const DISPATCH_ERROR_MESSAGE: &str =
    "Dispatch Error: no clause in the contract matches the request";

pub const UNKNOWN_LOGIC_ERROR: &str = "Unknown Logic Error";

pub trait Clause {
    fn name(&self) -> &str;

    /// Type names a request must satisfy, all of them, for this clause to run.
    fn request_types(&self) -> &[String];

    fn execute(&self, context: &Value, request: &Value) -> CovenantResult<Value>;
}

pub type ClauseCallback = dyn Fn(&Value, &Value) -> CovenantResult<Value> + Send + Sync + 'static;

#[derive(Clone)]
pub struct CallbackClause {
    name: String,
    request_types: Vec<String>,
    callback: Arc<ClauseCallback>,
}

impl CallbackClause {
    pub fn new(
        name: impl Into<String>,
        request_types: Vec<String>,
        callback: Arc<ClauseCallback>,
    ) -> Self {
        Self {
            name: name.into(),
            request_types,
            callback,
        }
    }
}

impl Clause for CallbackClause {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_types(&self) -> &[String] {
        &self.request_types
    }

    fn execute(&self, context: &Value, request: &Value) -> CovenantResult<Value> {
        (self.callback)(context, request)
    }
}

pub fn clause_from_callback<S, F>(
    name: impl Into<String>,
    request_types: impl IntoIterator<Item = S>,
    callback: F,
) -> Arc<dyn Clause + Send + Sync>
where
    S: Into<String>,
    F: Fn(&Value, &Value) -> CovenantResult<Value> + Send + Sync + 'static,
{
    Arc::new(CallbackClause::new(
        name,
        request_types.into_iter().map(Into::into).collect(),
        Arc::new(callback),
    ))
}

#[derive(Clone, Default)]
pub struct Contract {
    clauses: Vec<Arc<dyn Clause + Send + Sync>>,
}

impl Contract {
    pub fn new(clauses: Vec<Arc<dyn Clause + Send + Sync>>) -> Self {
        Self { clauses }
    }

    pub fn with_clause(mut self, clause: Arc<dyn Clause + Send + Sync>) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|clause| clause.name())
    }

    /// Run the first clause whose request types accept `context.request`.
    ///
    /// Clauses are tried in declaration order. When none matches, the result
    /// is `Right` of a branded [`ERROR_TYPE`] carrying
    /// [`DISPATCH_ERROR_MESSAGE`]. Fails only when `context` has no
    /// `request` field or a clause itself fails.
    pub fn dispatch(&self, registry: &SubtypeRegistry, context: &Value) -> CovenantResult<Value> {
        let request = dot(context, "request")?;
        for clause in &self.clauses {
            if let Value::Sum(Sum::Left(narrowed)) = registry.cast(clause.request_types(), &request)
            {
                tracing::debug!(clause = clause.name(), "dispatching request");
                return clause.execute(context, &narrowed);
            }
        }
        tracing::debug!(
            clauses = self.clauses.len(),
            kind = request.kind(),
            "no clause matched request"
        );
        Ok(fail(DISPATCH_ERROR_MESSAGE))
    }
}

/// Build the record a clause receives.
pub fn context(request: Value, state: Value, now: Value, emit: Value, contract: Value) -> Value {
    Value::Record(
        Record::new()
            .with("request", request)
            .with("state", state)
            .with("now", now)
            .with("emit", emit)
            .with("contract", contract),
    )
}

/// A branded error payload with `message`.
pub fn error_value(message: impl Into<String>) -> Value {
    let payload = Record::new().with("message", Value::String(message.into()));
    Value::Brand(Branded::single(ERROR_TYPE, Value::Record(payload)))
}

/// `Right(error_value(message))`.
pub fn fail(message: impl Into<String>) -> Value {
    sum::right(error_value(message))
}

/// Unwrap a top-level result: the Left payload, or the Right arm as an error.
pub fn unwrap_response(result: Value) -> CovenantResult<Value> {
    match result {
        Value::Sum(Sum::Left(payload)) => Ok(*payload),
        Value::Sum(Sum::Right(payload)) => Err(CovenantError::Logic(
            error_message(&payload).unwrap_or(UNKNOWN_LOGIC_ERROR).to_string(),
        )),
        other => Err(mismatch("sum", &other)),
    }
}

fn error_message(payload: &Value) -> Option<&str> {
    let Value::Brand(branded) = payload else {
        return None;
    };
    if !branded.type_names().iter().any(|name| name == ERROR_TYPE) {
        return None;
    }
    match branded.payload() {
        Value::Record(record) => match record.get("message") {
            Some(Value::String(message)) => Some(message),
            _ => None,
        },
        _ => None,
    }
}

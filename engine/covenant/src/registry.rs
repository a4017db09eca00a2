use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CovenantError, CovenantResult};
use crate::value::{mismatch, Branded, Value};

/// Target name that every value satisfies.
pub const ANY_TYPE: &str = "Any";

/// One declared `(subtype, supertype)` pair of the inheritance table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    pub sub: String,
    pub sup: String,
}

impl Edge {
    pub fn new(sub: impl Into<String>, sup: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            sup: sup.into(),
        }
    }
}

/// Read-only inheritance relation over nominal type names.
///
/// Lookups are single hop: only pairs listed in the table are subtypes. No
/// transitive closure is computed, so tables are expected to enumerate every
/// indirect pair explicitly.
#[derive(Clone, Debug, Default)]
pub struct SubtypeRegistry {
    edges: Vec<Edge>,
}

impl SubtypeRegistry {
    pub fn from_edges(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// True when `(sub, sup)` is a declared edge.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.sub == sub && edge.sup == sup)
    }

    /// Attempt to narrow `value` to all of `targets`.
    ///
    /// Returns `Left(value)` when every target (other than `Any`) is matched
    /// by one of the value's type names, either exactly or through a declared
    /// edge, and `Right(unit)` otherwise. `["Any"]` accepts any value, branded
    /// or not. A miss is an ordinary value so dispatch can try the next
    /// alternative.
    pub fn cast<S: AsRef<str>>(&self, targets: &[S], value: &Value) -> Value {
        if let [only] = targets {
            if only.as_ref() == ANY_TYPE {
                return Value::left(value.clone());
            }
        }
        let type_names: &[String] = match value {
            Value::Brand(branded) => branded.type_names(),
            _ => &[],
        };
        for target in targets {
            let target = target.as_ref();
            if target == ANY_TYPE {
                continue;
            }
            let found = type_names
                .iter()
                .any(|name| name == target || self.is_subtype(name, target));
            if !found {
                tracing::trace!(wanted = target, kind = value.kind(), "cast miss");
                return Value::right(Value::Unit);
            }
        }
        Value::left(value.clone())
    }
}

static GLOBAL: OnceLock<SubtypeRegistry> = OnceLock::new();

/// Install the process-wide registry. Succeeds once; later calls fail and
/// leave the installed table untouched.
pub fn install(registry: SubtypeRegistry) -> CovenantResult<&'static SubtypeRegistry> {
    let edges = registry.len();
    GLOBAL
        .set(registry)
        .map_err(|_| CovenantError::Config("subtype registry is already installed".to_string()))?;
    tracing::debug!(edges, "installed subtype registry");
    Ok(global())
}

/// The installed registry, or an empty one when nothing was installed.
pub fn global() -> &'static SubtypeRegistry {
    static EMPTY: SubtypeRegistry = SubtypeRegistry { edges: Vec::new() };
    GLOBAL.get().unwrap_or(&EMPTY)
}

/// Attach nominal type names to `payload`.
pub fn brand<S: Into<String>>(
    type_names: impl IntoIterator<Item = S>,
    payload: Value,
) -> CovenantResult<Value> {
    let names = type_names.into_iter().map(Into::into).collect();
    Ok(Value::Brand(Branded::new(names, payload)?))
}

pub fn unbrand(value: &Value) -> CovenantResult<Value> {
    match value {
        Value::Brand(branded) => Ok(branded.payload().clone()),
        other => Err(mismatch("branded value", other)),
    }
}

/// [`SubtypeRegistry::cast`] against the process-wide registry.
pub fn cast<S: AsRef<str>>(targets: &[S], value: &Value) -> Value {
    global().cast(targets, value)
}

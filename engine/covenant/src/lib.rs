/* Copyright (c) 2026 Olle Mårtensson. This Source Code Form is subject to the terms of the Eclipse Public License, v. 2.0. */
//! Covenant: value runtime for compiled contract clauses.
//!
//! Compiled programs represent all data as branded objects, boxed naturals,
//! boxed collections, records and Left/Right sums. This crate supplies the
//! primitives those programs call: a single structural order, record and
//! collection algebra, nominal subtype casting and calendar arithmetic.
//!
//! # Examples
//! ```
//! use covenant::{collection, registry, Edge, SubtypeRegistry, Value};
//!
//! let registry = SubtypeRegistry::from_edges(vec![Edge::new("LateDelivery", "Request")]);
//! let request = registry::brand(["LateDelivery"], Value::record([("id", Value::Nat(1))]))
//!     .expect("brand");
//! assert_eq!(registry.cast(&["Request"], &request), Value::left(request.clone()));
//!
//! let items = Value::coll(vec![Value::Nat(2), Value::Nat(1), Value::Nat(2)]);
//! let unique = collection::distinct(&items).expect("distinct");
//! assert_eq!(collection::count(&unique).expect("count"), Value::Nat(2));
//! ```

mod error;
pub mod value;

pub mod calendar;
pub mod collection;
pub mod dispatch;
pub mod duration;
pub mod numeric;
pub mod ordering;
pub mod record;
pub mod registry;
pub mod sum;

#[cfg(feature = "serde")]
pub mod config;
#[cfg(feature = "serde")]
pub mod json;

pub use calendar::{Calendar, CalendarUnit, Date, Period, PeriodUnit};
pub use collection::{SortCriterion, SortDirection};
pub use dispatch::{
    clause_from_callback, unwrap_response, CallbackClause, Clause, Contract, ERROR_TYPE,
};
pub use duration::{Duration, DurationUnit};
pub use error::{CovenantError, CovenantResult};
pub use ordering::{compare, equal};
pub use registry::{Edge, SubtypeRegistry, ANY_TYPE};
pub use value::{Branded, Collection, Record, Sum, Value};

#[cfg(feature = "serde")]
pub use config::RuntimeConfig;

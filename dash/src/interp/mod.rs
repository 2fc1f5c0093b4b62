//! Tree-walking execution engine: values, scopes, callables, evaluator

pub mod callable;
pub mod ctx;
pub mod eval;
pub mod ops;
pub mod reference;
pub mod scope;
pub mod value;

pub use callable::{call_value, BuiltinFn, Callable};
pub use ctx::{CallTrace, ExecCtx, Marker, StateRef};
pub use eval::{eval, expect_value};
pub use scope::ScopeRef;
pub use value::{Flow, Value};

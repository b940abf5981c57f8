//! Analyses over `cmf-core` IR: numeric coercion classification and
//! function-purity (effect) analysis. Neither module mutates the IR it
//! inspects -- both are read-only passes consumed by `cmf-passes`.

pub mod coercion;
pub mod effects;

pub use coercion::{is_float, is_integer, is_numeric, widening_step, Widen};
pub use effects::{analyze_purity, pointer_param_allocas, traces_to_pointer_param};

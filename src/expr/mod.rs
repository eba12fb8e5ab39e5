pub mod eval;
pub mod node;
pub mod simplify;
pub mod typecheck;

pub use eval::{EvalContext, Variables};
pub use node::{
    ArithmeticOp, ComparisonOp, Expression, LogicOp, WindowOp, TRUE_LEVEL,
};

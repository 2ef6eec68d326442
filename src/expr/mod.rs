//! Symbolic expressions and constraints (spec.md §3–§4.A).
//!
//! Component A: four result-kinds (`num`, `bool`, `shape`, `string`), tied
//! together by [`constraint`], the cross-cutting constraint layer.

pub mod boolean;
pub mod constraint;
pub mod num;
pub mod shape;
pub mod string;

pub use boolean::BoolExpr;
pub use constraint::{Constraint, ConstraintKind, Operand};
pub use num::{NumBinOp, NumConst, NumExpr, NumReduceOp};
pub use shape::ShapeExpr;
pub use string::{resolve_index, StringExpr};

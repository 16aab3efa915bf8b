//! Host-side semantic primitives consumed by both the interpreter and the
//! codegen: NaN-aware float comparisons, fixed-point rounding and saturating
//! averages, RISC-V division/remainder semantics, the reciprocal-
//! square-root estimate, and the vector tail/mask element policy.
//!
//! Ported from `intrinsics/include/berberis/intrinsics/*` and
//! `intrinsics/riscv64_to_all/include/berberis/intrinsics/*`.

pub mod fixed_point;
pub mod float_ops;
pub mod guest_cpu_flags;
pub mod int_ops;
pub mod vector;

pub use fixed_point::{aadd, asub, roundoff, FixedPointInt};
pub use float_ops::{execute_float_op, max_f32, max_f64, min_f32, min_f64, rsqrt_estimate_f32, rsqrt_estimate_f64, RmmFloat};
pub use int_ops::{div, rem, DivRemInt};

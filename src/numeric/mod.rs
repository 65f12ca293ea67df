//! Extended-precision arithmetic for posterior masses
//!
//! After a few hundred channel uses the mass of the interval holding the
//! message and the width of that interval both fall far below what `f64`
//! can distinguish from zero. Every quantity stored in the partition tree
//! is therefore a [`Real`]: a decimal with a bounded number of significant
//! digits but an unbounded exponent.

mod real;

pub use real::{ParseRealError, Real, DEFAULT_TOLERANCE, PRECISION_DIGITS};

//! Reduction operators applied by `reduce` and `all_reduce`.
//!
//! Operators may fail (integer overflow, mismatched vector lengths, or any
//! user closure returning `Err`). A failure is reported as
//! [`CollError::OperatorFailure`](crate::CollError::OperatorFailure) on every
//! rank taking part in the call.

/// A binary, associative combining function over `T`.
///
/// `combine(acc, other)` folds `other` into the running value `acc`. The
/// engine always calls it with the local value first and children in
/// ascending logical rank order, so non-commutative-in-practice operators
/// (floating point sums) still produce run-to-run identical results.
pub trait Combine<T>: Send + Sync {
    fn combine(&self, acc: T, other: T) -> std::result::Result<T, String>;
}

/// Built-in reduction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Sum. Integer overflow fails the operator.
    Sum,
    /// Product. Integer overflow fails the operator.
    Prod,
    Min,
    Max,
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
        }
    }
}

/// Adapter turning a closure into a [`Combine`] operator.
///
/// ```
/// use topocoll::{Combine, FnOp};
///
/// let concat = FnOp(|a: String, b: String| Ok::<_, String>(a + &b));
/// assert_eq!(concat.combine("ab".into(), "c".into()).unwrap(), "abc");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnOp<F>(pub F);

impl<T, F> Combine<T> for FnOp<F>
where
    F: Fn(T, T) -> std::result::Result<T, String> + Send + Sync,
{
    fn combine(&self, acc: T, other: T) -> std::result::Result<T, String> {
        (self.0)(acc, other)
    }
}

fn combine_elementwise<T>(
    acc: Vec<T>,
    other: Vec<T>,
    f: impl Fn(T, T) -> std::result::Result<T, String>,
) -> std::result::Result<Vec<T>, String> {
    if acc.len() != other.len() {
        return Err(format!(
            "element-wise reduce over vectors of length {} and {}",
            acc.len(),
            other.len()
        ));
    }
    acc.into_iter()
        .zip(other)
        .map(|(a, b)| f(a, b))
        .collect()
}

macro_rules! impl_reduce_op {
    (int: $($ty:ty),*) => {
        $(
            impl Combine<$ty> for ReduceOp {
                #[inline]
                fn combine(&self, a: $ty, b: $ty) -> std::result::Result<$ty, String> {
                    let out = match self {
                        ReduceOp::Sum => a.checked_add(b),
                        ReduceOp::Prod => a.checked_mul(b),
                        ReduceOp::Min => Some(a.min(b)),
                        ReduceOp::Max => Some(a.max(b)),
                    };
                    out.ok_or_else(|| {
                        format!("{self} of {a} and {b} overflows {}", stringify!($ty))
                    })
                }
            }

            impl Combine<Vec<$ty>> for ReduceOp {
                fn combine(
                    &self,
                    a: Vec<$ty>,
                    b: Vec<$ty>,
                ) -> std::result::Result<Vec<$ty>, String> {
                    combine_elementwise(a, b, |x, y| Combine::<$ty>::combine(self, x, y))
                }
            }
        )*
    };
    (float: $($ty:ty),*) => {
        $(
            impl Combine<$ty> for ReduceOp {
                #[inline]
                fn combine(&self, a: $ty, b: $ty) -> std::result::Result<$ty, String> {
                    Ok(match self {
                        ReduceOp::Sum => a + b,
                        ReduceOp::Prod => a * b,
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    })
                }
            }

            impl Combine<Vec<$ty>> for ReduceOp {
                fn combine(
                    &self,
                    a: Vec<$ty>,
                    b: Vec<$ty>,
                ) -> std::result::Result<Vec<$ty>, String> {
                    combine_elementwise(a, b, |x, y| Combine::<$ty>::combine(self, x, y))
                }
            }
        )*
    };
}

impl_reduce_op!(int: i8, i16, i32, i64, u8, u16, u32, u64);
impl_reduce_op!(float: f32, f64);

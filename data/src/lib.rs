//! Data formats used by the distributed Game of Life simulation

pub mod grid;
pub mod rule;
pub mod text;

/// Build a 2D array from a function of the axis index
///
/// Handy for computing per-axis quantities like stencil bounds.
pub fn array2<T>(f: impl FnMut(usize) -> T) -> [T; 2] {
    std::array::from_fn(f)
}

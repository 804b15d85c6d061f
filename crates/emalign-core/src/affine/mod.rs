pub mod map;
pub mod solver;

pub use map::{AffineMap, AffineShape, Bounds, Point2};
pub use solver::{AffineFit, AffineSolver, Correspondence, SolverConfig};

pub mod affine;
pub mod align;
pub mod consts;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod pixel;
pub mod register;
pub mod warp;

pub mod mesh;
pub mod raster;
pub mod sampler;

pub use mesh::{Mesh, Vertex};
pub use raster::{WarpOptions, WarpRasterizer, WarpReport};
pub use sampler::{ChannelMap, Interpolation};

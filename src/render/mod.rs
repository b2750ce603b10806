pub mod camera;
pub mod planes;

pub use camera::Camera;
pub use planes::{GpuTexture, PlaneFit, PlaneRenderer};

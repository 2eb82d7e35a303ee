pub mod magnet;
pub mod size;
pub mod time;

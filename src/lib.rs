pub mod args;
pub mod camera;
pub mod config;
pub mod detector;
pub mod error;
pub mod head_pose;
pub mod inference;
pub mod payload;
pub mod pipeline;
pub mod transport;
pub mod types;

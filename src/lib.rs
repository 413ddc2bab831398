pub mod camera;
pub mod coach;
pub mod config;
pub mod emotion;
pub mod error;
pub mod feedback;
pub mod pose;
pub mod rig;
pub mod score;
pub mod tracker;

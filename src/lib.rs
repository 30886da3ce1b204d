pub mod camera;
pub mod codec;
pub mod config;
pub mod engine;
pub mod events;
pub mod frame;
pub mod gateway;
pub mod geo;
pub mod host;
pub mod options;
pub mod overlay;
pub mod session;

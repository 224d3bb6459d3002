//! Webcam hand-gesture recognition with on-screen buttons pressed by a
//! forward push of the index fingertip.

pub mod args;
pub mod camera;
pub mod config;
pub mod controls;
pub mod detector;
pub mod driver;
pub mod error;
pub mod font;
pub mod inference;
pub mod interaction;
pub mod loader;
pub mod logging;
pub mod model_download;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod recognizer;
pub mod scheduler;
pub mod ttf;
pub mod types;

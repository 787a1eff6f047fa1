//! Sitepipe - static-site asset pipeline
//!
//! This library provides functionality to:
//! - Render HTML pages from layouts, partials, and data files
//! - Compile Sass, add vendor prefixes, and minify the result
//! - Bundle and minify scripts with include directives
//! - Losslessly compress images
//! - Watch sources and push live-reload events to a development server

pub mod build;
pub mod cli;
pub mod config;
pub mod logging;
pub mod server;
pub mod transform;
pub mod watch;

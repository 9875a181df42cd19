//! Mdpress - CLI for converting markdown documents via pluggable handlers.
//!
//! This library provides the configuration and plugin-registry resolution
//! engine behind the CLI, including:
//! - Main config selection across factory/project/XDG/bundled scopes
//! - Plugin registration from four sources with strict precedence
//! - Cascading override layers with provenance tracking
//! - Stylesheet list merging under an inherit/replace policy
//! - Warn-only schema validation for typo detection
//!
//! # Example
//!
//! ```no_run
//! use mdpress_cli::config::{ConfigResolver, ResolverOptions, ResolverPaths};
//! use std::path::PathBuf;
//!
//! let paths = ResolverPaths {
//! 	bundled_root: PathBuf::from("/usr/lib/mdpress"),
//! 	xdg_config_dir: PathBuf::from("/home/me/.config/mdpress"),
//! 	project_manifest: None,
//! };
//! let resolver = ConfigResolver::new(paths, ResolverOptions::default(), None);
//!
//! let effective = resolver.effective_config("default", None, None).unwrap();
//! println!("handler: {}", effective.handler_script_path.display());
//! for warning in &effective.warnings {
//! 	eprintln!("{warning}");
//! }
//! ```

pub mod collection;
pub mod config;
pub mod css;
pub mod error;
pub mod plugin;

pub use error::{MdpressError, Result};

//! Layered configuration resolution for mdpress.
//!
//! This module handles:
//! - Main config selection across factory/project/XDG/bundled scopes
//! - Plugin registry construction from four registration sources
//! - Override layering (file-based and inline, per scope)
//! - Schema-based typo detection that warns without blocking
//! - Effective-config assembly, caching, and provenance tracking

pub mod diagnostics;
pub mod layers;
pub mod main_config;
pub mod options;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod value;

pub use diagnostics::{Diagnostic, Severity};
pub use main_config::MainConfigSet;
pub use options::{MarginOptions, MathOptions, PdfOptions, TocOptions};
pub use registry::{PLUGIN_CONFIG_SUFFIX, PluginRegistry};
pub use resolver::{ConfigResolver, ResolverOptions};
pub use types::{
	ConfigFileSources, EffectiveConfig, LoadReason, MainConfig, PluginRegistryEntry,
	RawPluginLayer, ResolverPaths, SourceTier,
};
pub use value::deep_merge;

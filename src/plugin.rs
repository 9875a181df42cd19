//! The plugin capability seam.
//!
//! A plugin's configuration names a handler script; the conversion pipeline
//! maps that handler to a registered [`DocumentGenerator`] and invokes it.
//! Registration is explicit — there is no dynamic module loading — so the
//! set of generators a binary supports is visible in one place.

use crate::config::EffectiveConfig;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// The one capability a plugin provides: generate an output document from
/// an input document under a fully resolved configuration.
pub trait DocumentGenerator {
	/// Stable name the handler script is matched against.
	fn name(&self) -> &str;

	/// Produce `output_path` from `markdown_path` under `config`.
	fn generate(
		&self,
		config: &EffectiveConfig,
		markdown_path: &Path,
		output_path: &Path,
	) -> Result<()>;
}

/// Explicit name → generator lookup table.
#[derive(Default)]
pub struct GeneratorRegistry {
	generators: BTreeMap<String, Box<dyn DocumentGenerator>>,
}

impl GeneratorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a generator under its own name. Last registration wins.
	pub fn register(&mut self, generator: Box<dyn DocumentGenerator>) {
		self.generators
			.insert(generator.name().to_string(), generator);
	}

	/// Look up the generator for a handler script, matched by file stem
	/// (`handler.tpl` → `handler`).
	pub fn for_handler(&self, handler_script: &Path) -> Option<&dyn DocumentGenerator> {
		let stem = handler_script.file_stem()?.to_str()?;
		self.generators.get(stem).map(|generator| generator.as_ref())
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.generators.keys().map(String::as_str)
	}
}

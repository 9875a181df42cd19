//! Stylesheet resolution and merging.
//!
//! Each configuration layer may declare `css_files` and an `inherit_css`
//! flag. This module resolves the declared references against the layer's
//! own directory and merges them into the list accumulated so far: inherit
//! appends, non-inherit replaces.

use crate::config::Diagnostic;
use crate::config::value::expand_tilde;
use std::path::{Path, PathBuf};

/// Resolve declared stylesheet references against `base_dir` and merge them
/// into `existing` under the inherit/replace policy.
///
/// Missing files are reported as warnings but kept in the list; the final
/// existence filter happens once, after all layers have contributed.
pub fn resolve_and_merge(
	declared: &[String],
	base_dir: &Path,
	existing: &[PathBuf],
	inherit_css: bool,
	plugin_name: &str,
	source_description: &str,
	diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PathBuf> {
	let mut resolved = Vec::new();

	for reference in declared {
		let path = match expand_tilde(reference) {
			Ok(path) => path,
			Err(err) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Skipping stylesheet '{}' for plugin '{}' ({}): {}",
					reference, plugin_name, source_description, err
				)));
				continue;
			}
		};
		let path = if path.is_absolute() {
			path
		} else {
			base_dir.join(path)
		};

		if !path.exists() {
			diagnostics.push(Diagnostic::warning(format!(
				"Stylesheet '{}' declared by {} for plugin '{}' not found at {}",
				reference,
				source_description,
				plugin_name,
				path.display()
			)));
		}
		resolved.push(path);
	}

	if inherit_css {
		let mut merged = existing.to_vec();
		merged.extend(resolved);
		merged
	} else {
		resolved
	}
}

/// Deduplicate the accumulated list and drop entries absent from disk.
pub fn dedupe_existing(paths: &[PathBuf]) -> Vec<PathBuf> {
	let mut seen = std::collections::HashSet::new();
	paths
		.iter()
		.filter(|path| path.exists())
		.filter(|path| seen.insert((*path).clone()))
		.cloned()
		.collect()
}

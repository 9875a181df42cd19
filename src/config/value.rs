use crate::config::diagnostics::Diagnostic;
use crate::error::{MdpressError, Result};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Key whose value is pinned to the plugin's own base config file.
pub const KEY_HANDLER_SCRIPT: &str = "handler_script";

/// Keys whose merge semantics belong to the stylesheet resolver, not to
/// generic deep merging.
pub const KEY_CSS_FILES: &str = "css_files";
pub const KEY_INHERIT_CSS: &str = "inherit_css";

/// Recursively merge `source` into `target`.
///
/// Mappings merge key by key; scalars and sequences from `source` overwrite.
/// Two keys are special-cased at any depth:
/// - `handler_script` is taken from `source` only if `target` does not
///   already have one (first writer wins).
/// - `css_files` and `inherit_css` are always taken verbatim from `source`
///   when present; their semantics are applied separately per layer.
pub fn deep_merge(target: &Value, source: &Value) -> Value {
	match (target, source) {
		(Value::Mapping(t), Value::Mapping(s)) => {
			let mut merged = t.clone();
			for (key, source_value) in s {
				let key_name = key.as_str();

				if key_name == Some(KEY_HANDLER_SCRIPT) && merged.contains_key(key) {
					continue;
				}

				if key_name == Some(KEY_CSS_FILES) || key_name == Some(KEY_INHERIT_CSS) {
					merged.insert(key.clone(), source_value.clone());
					continue;
				}

				let merged_value = match merged.get(key) {
					Some(target_value) => deep_merge(target_value, source_value),
					None => source_value.clone(),
				};
				merged.insert(key.clone(), merged_value);
			}
			Value::Mapping(merged)
		}
		// Anything that is not a mapping-to-mapping merge is an overwrite.
		_ => source.clone(),
	}
}

/// Get a nested mapping by key, if present.
pub fn get_mapping<'a>(doc: &'a Value, key: &str) -> Option<&'a Mapping> {
	doc.get(key).and_then(Value::as_mapping)
}

/// Get a string value by key, if present.
pub fn get_str<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
	doc.get(key).and_then(Value::as_str)
}

/// Get a bool value by key, defaulting when absent.
pub fn get_bool_or(doc: &Value, key: &str, default: bool) -> bool {
	doc.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Collect a sequence of strings by key. Non-string entries are skipped.
pub fn string_sequence(doc: &Value, key: &str) -> Vec<String> {
	doc.get(key)
		.and_then(Value::as_sequence)
		.map(|seq| {
			seq.iter()
				.filter_map(Value::as_str)
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default()
}

/// Read and parse a YAML file, failing on I/O or syntax errors.
///
/// Used for plugin base configs, where an unreadable file is fatal.
pub fn load_yaml_file(path: &Path) -> Result<Value> {
	let content =
		std::fs::read_to_string(path).map_err(|source| MdpressError::PluginConfigRead {
			path: path.to_path_buf(),
			source,
		})?;

	serde_yaml::from_str(&content).map_err(|source| MdpressError::PluginConfigParse {
		path: path.to_path_buf(),
		source,
	})
}

/// Read and parse a YAML file, substituting an empty mapping on any failure.
///
/// Used for main documents and override layers, where resolution must
/// degrade rather than abort. A diagnostic records what was skipped.
pub fn load_yaml_lenient(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Value {
	let content = match std::fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) => {
			diagnostics.push(Diagnostic::warning(format!(
				"Could not read {}: {}; using empty config",
				path.display(),
				err
			)));
			return Value::Mapping(Mapping::new());
		}
	};

	match serde_yaml::from_str::<Value>(&content) {
		// An empty file parses as null; treat it as an empty mapping.
		Ok(Value::Null) => Value::Mapping(Mapping::new()),
		Ok(value @ Value::Mapping(_)) => value,
		Ok(_) => {
			diagnostics.push(Diagnostic::warning(format!(
				"{} is not a YAML mapping; using empty config",
				path.display()
			)));
			Value::Mapping(Mapping::new())
		}
		Err(err) => {
			diagnostics.push(Diagnostic::warning(format!(
				"Could not parse {}: {}; using empty config",
				path.display(),
				err
			)));
			Value::Mapping(Mapping::new())
		}
	}
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
	if path == "~" || path.starts_with("~/") {
		let home = dirs::home_dir().ok_or(MdpressError::HomeDirectoryNotFound)?;
		if path == "~" {
			Ok(home)
		} else {
			Ok(home.join(&path[2..]))
		}
	} else {
		Ok(PathBuf::from(path))
	}
}

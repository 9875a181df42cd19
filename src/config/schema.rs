use crate::config::diagnostics::Diagnostic;
use crate::config::types::ResolverPaths;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Expected YAML type of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
	String,
	Bool,
	Number,
	Sequence,
	Mapping,
}

impl TypeTag {
	fn matches(&self, value: &Value) -> bool {
		match self {
			TypeTag::String => value.is_string(),
			TypeTag::Bool => value.is_bool(),
			TypeTag::Number => value.is_number(),
			TypeTag::Sequence => value.is_sequence(),
			TypeTag::Mapping => value.is_mapping(),
		}
	}

	fn as_str(&self) -> &'static str {
		match self {
			TypeTag::String => "string",
			TypeTag::Bool => "bool",
			TypeTag::Number => "number",
			TypeTag::Sequence => "sequence",
			TypeTag::Mapping => "mapping",
		}
	}
}

/// Schema of one nested option group. Closed groups reject unknown
/// properties, which is how likely typos get surfaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSchema {
	#[serde(default)]
	pub closed: bool,

	#[serde(default)]
	pub properties: BTreeMap<String, TypeTag>,
}

/// A plugin config schema: expected types for top-level properties plus
/// per-group constraints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
	#[serde(default)]
	pub properties: BTreeMap<String, TypeTag>,

	#[serde(default)]
	pub groups: BTreeMap<String, GroupSchema>,
}

impl Schema {
	/// Overlay another schema on top of this one (other wins per key;
	/// group property maps are extended, not replaced).
	fn overlay(&self, other: &Schema) -> Schema {
		let mut merged = self.clone();
		merged.properties.extend(other.properties.clone());
		for (name, group) in &other.groups {
			let entry = merged.groups.entry(name.clone()).or_default();
			entry.closed = group.closed;
			entry.properties.extend(group.properties.clone());
		}
		merged
	}
}

/// The compiled shared base schema. Compiled once, eagerly, when the
/// resolver is constructed; a missing base schema disables validation
/// entirely (a documented degrade, reported as a critical diagnostic).
#[derive(Debug, Clone)]
pub struct SchemaSet {
	base: Option<Schema>,
}

impl SchemaSet {
	pub fn compile(paths: &ResolverPaths, diagnostics: &mut Vec<Diagnostic>) -> Self {
		let path = paths.base_schema();
		match load_schema_file(&path) {
			Ok(schema) => SchemaSet { base: Some(schema) },
			Err(reason) => {
				diagnostics.push(Diagnostic::critical(format!(
					"Base config schema unusable ({reason}); config validation is disabled"
				)));
				SchemaSet { base: None }
			}
		}
	}

	/// Whether any validation will happen at all.
	pub fn enabled(&self) -> bool {
		self.base.is_some()
	}

	/// Validate a plugin's base document against the base schema composed
	/// with the plugin's own schema file, when one exists beside the plugin.
	///
	/// Every finding is a warning; validation never halts resolution.
	pub fn validate(
		&self,
		plugin_name: &str,
		document: &Value,
		plugin_schema_path: &Path,
		diagnostics: &mut Vec<Diagnostic>,
	) {
		let Some(base) = &self.base else {
			return;
		};

		let schema = if plugin_schema_path.is_file() {
			match load_schema_file(plugin_schema_path) {
				Ok(plugin_schema) => base.overlay(&plugin_schema),
				Err(reason) => {
					diagnostics.push(Diagnostic::warning(format!(
						"Ignoring plugin schema {}: {}",
						plugin_schema_path.display(),
						reason
					)));
					base.clone()
				}
			}
		} else {
			base.clone()
		};

		let Some(mapping) = document.as_mapping() else {
			return;
		};

		for (key, value) in mapping {
			let Some(key) = key.as_str() else { continue };
			if let Some(expected) = schema.properties.get(key)
				&& !expected.matches(value)
			{
				diagnostics.push(Diagnostic::warning(format!(
					"Plugin '{}': property '{}' should be a {}",
					plugin_name,
					key,
					expected.as_str()
				)));
			}
		}

		for (group_name, group) in &schema.groups {
			let Some(group_value) = mapping.get(group_name.as_str()) else {
				continue;
			};
			let Some(group_mapping) = group_value.as_mapping() else {
				continue;
			};

			for (key, value) in group_mapping {
				let Some(key) = key.as_str() else { continue };
				match group.properties.get(key) {
					Some(expected) if !expected.matches(value) => {
						diagnostics.push(Diagnostic::warning(format!(
							"Plugin '{}': '{}.{}' should be a {}",
							plugin_name,
							group_name,
							key,
							expected.as_str()
						)));
					}
					Some(_) => {}
					None if group.closed => {
						diagnostics.push(Diagnostic::warning(format!(
							"Plugin '{}': unknown property '{}.{}' (possible typo)",
							plugin_name, group_name, key
						)));
					}
					None => {}
				}
			}
		}
	}
}

fn load_schema_file(path: &Path) -> Result<Schema, String> {
	let content = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
	serde_yaml::from_str(&content).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::diagnostics::Severity;
	use std::fs;
	use std::path::PathBuf;

	const BASE_SCHEMA: &str = r#"
properties:
  handler_script: string
  description: string
  css_files: sequence
  inherit_css: bool
groups:
  pdf_options:
    closed: true
    properties:
      format: string
      landscape: bool
      margin: mapping
"#;

	fn schema_set(root: &Path) -> (SchemaSet, Vec<Diagnostic>) {
		let paths = ResolverPaths {
			bundled_root: root.to_path_buf(),
			xdg_config_dir: root.join("xdg"),
			project_manifest: None,
		};
		let mut diagnostics = Vec::new();
		let set = SchemaSet::compile(&paths, &mut diagnostics);
		(set, diagnostics)
	}

	fn write_base_schema(root: &Path) {
		fs::create_dir_all(root.join("schema")).unwrap();
		fs::write(root.join("schema/base.schema.yaml"), BASE_SCHEMA).unwrap();
	}

	fn yaml(s: &str) -> Value {
		serde_yaml::from_str(s).unwrap()
	}

	#[test]
	fn test_missing_base_schema_disables_validation() {
		let dir = tempfile::tempdir().unwrap();
		let (set, diagnostics) = schema_set(dir.path());

		assert!(!set.enabled());
		assert_eq!(diagnostics.len(), 1);
		assert_eq!(diagnostics[0].severity, Severity::Critical);

		// Validation is a no-op afterwards.
		let mut during = Vec::new();
		set.validate(
			"p",
			&yaml("{pdf_options: {formt: A4}}"),
			&PathBuf::from("/none"),
			&mut during,
		);
		assert!(during.is_empty());
	}

	#[test]
	fn test_unknown_property_in_closed_group_warns() {
		let dir = tempfile::tempdir().unwrap();
		write_base_schema(dir.path());
		let (set, startup) = schema_set(dir.path());
		assert!(startup.is_empty());

		let mut diagnostics = Vec::new();
		set.validate(
			"cv",
			&yaml("{handler_script: h.tpl, pdf_options: {formt: A4}}"),
			&PathBuf::from("/none"),
			&mut diagnostics,
		);

		assert_eq!(diagnostics.len(), 1);
		assert!(diagnostics[0].message.contains("pdf_options.formt"));
		assert!(diagnostics[0].message.contains("possible typo"));
	}

	#[test]
	fn test_type_mismatch_warns() {
		let dir = tempfile::tempdir().unwrap();
		write_base_schema(dir.path());
		let (set, _) = schema_set(dir.path());

		let mut diagnostics = Vec::new();
		set.validate(
			"cv",
			&yaml("{css_files: not-a-list, pdf_options: {landscape: yes-please}}"),
			&PathBuf::from("/none"),
			&mut diagnostics,
		);

		assert_eq!(diagnostics.len(), 2);
		assert!(diagnostics[0].message.contains("'css_files' should be a sequence"));
		assert!(diagnostics[1].message.contains("'pdf_options.landscape' should be a bool"));
	}

	#[test]
	fn test_plugin_schema_extends_base() {
		let dir = tempfile::tempdir().unwrap();
		write_base_schema(dir.path());
		let plugin_schema = dir.path().join("cv.schema.yaml");
		fs::write(
			&plugin_schema,
			"groups:\n  pdf_options:\n    closed: true\n    properties:\n      watermark: string\n",
		)
		.unwrap();
		let (set, _) = schema_set(dir.path());

		let mut diagnostics = Vec::new();
		set.validate(
			"cv",
			&yaml("{pdf_options: {watermark: DRAFT, format: A4}}"),
			&plugin_schema,
			&mut diagnostics,
		);

		// watermark comes from the plugin schema, format from the base.
		assert!(diagnostics.is_empty());
	}

	#[test]
	fn test_unreadable_plugin_schema_warns_and_continues() {
		let dir = tempfile::tempdir().unwrap();
		write_base_schema(dir.path());
		let plugin_schema = dir.path().join("cv.schema.yaml");
		fs::write(&plugin_schema, "properties: [broken").unwrap();
		let (set, _) = schema_set(dir.path());

		let mut diagnostics = Vec::new();
		set.validate(
			"cv",
			&yaml("{pdf_options: {format: A4}}"),
			&plugin_schema,
			&mut diagnostics,
		);

		assert_eq!(diagnostics.len(), 1);
		assert!(diagnostics[0].message.contains("Ignoring plugin schema"));
	}
}

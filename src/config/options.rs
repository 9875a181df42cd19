use serde::Deserialize;
use serde_yaml::Value;

/// Typed views over the merged plugin document's option groups.
///
/// The merge pipeline works on untyped YAML so that arbitrary plugin keys
/// survive layering; these types give callers a validated shape at the
/// boundary. Parsing is permissive about unknown keys — typos are already
/// surfaced by schema validation — and falls back to defaults when a group
/// has the wrong shape entirely.

/// Page/print options consumed by the PDF rasterizer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
	pub format: Option<String>,
	pub landscape: Option<bool>,
	pub scale: Option<f64>,
	pub print_background: Option<bool>,
	pub display_header_footer: Option<bool>,
	pub margin: MarginOptions,
}

/// Page margins, kept as strings so units pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarginOptions {
	pub top: Option<String>,
	pub right: Option<String>,
	pub bottom: Option<String>,
	pub left: Option<String>,
}

/// Math rendering options. `engine_options` stays untyped: its shape
/// belongs to whichever engine is selected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MathOptions {
	pub enabled: Option<bool>,
	pub engine: Option<String>,
	pub katex_options: Option<Value>,
}

/// Table-of-contents options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TocOptions {
	pub enabled: Option<bool>,
	pub max_depth: Option<u8>,
	pub title: Option<String>,
}

/// Parse one option group out of a merged document, defaulting on absence
/// or shape mismatch.
pub fn parse_group<T>(document: &Value, key: &str) -> T
where
	T: Default + for<'de> Deserialize<'de>,
{
	document
		.get(key)
		.cloned()
		.and_then(|value| serde_yaml::from_value(value).ok())
		.unwrap_or_default()
}

impl crate::config::types::EffectiveConfig {
	/// Typed view of the merged `pdf_options` group.
	pub fn pdf_options(&self) -> PdfOptions {
		parse_group(&self.plugin_config, "pdf_options")
	}

	/// Typed view of the merged `math` group.
	pub fn math_options(&self) -> MathOptions {
		parse_group(&self.plugin_config, "math")
	}

	/// Typed view of the merged `toc_options` group.
	pub fn toc_options(&self) -> TocOptions {
		parse_group(&self.plugin_config, "toc_options")
	}
}

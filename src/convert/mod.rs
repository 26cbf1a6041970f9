//! Structural converters between the backend-agnostic form and each
//! deployment's wire shape.
//!
//! A converter is a pure function over untyped trees: it reads the source
//! node through [`get_value_by_path`], writes a fresh output node through
//! [`set_value_by_path`], and never mutates its source. The third argument is
//! the destination-context node: a few converters hoist fields into their
//! parent instead of (or in addition to) their own output, e.g. the realtime
//! connect config spreads generation parameters into the enclosing setup
//! frame.
//!
//! Backend dispatch happens exactly once per call site, by choosing the
//! [`mldev`] or [`vertex`] module off the backend fixed at client
//! construction. Converter bodies themselves contain no backend conditionals.

pub mod mldev;
pub mod vertex;

use crate::config::ResolvedConfig;
use crate::utils::{get_value_by_path, set_value_by_path};
use crate::{Error, Result};
use serde_json::Value;

/// Per-(type, backend, direction) converter over untyped trees.
pub type ConverterFn = fn(&ResolvedConfig, &Value, &mut Value) -> Result<Value>;

/// Map a converter over every element of a sequence node.
pub fn apply_converter_to_slice(
    cfg: &ResolvedConfig,
    items: &Value,
    parent: &mut Value,
    converter: ConverterFn,
) -> Result<Value> {
    let arr = items
        .as_array()
        .ok_or_else(|| Error::Convert(format!("expected a sequence, got: {items}")))?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(converter(cfg, item, parent)?);
    }
    Ok(Value::Array(out))
}

/// Abort with a conversion error unless `value` is a map node.
pub(crate) fn expect_object(value: &Value, type_name: &str) -> Result<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(Error::Convert(format!(
            "expected {type_name} to be a map, got: {value}"
        )))
    }
}

/// Copy a field verbatim from source path to destination path, if present.
pub(crate) fn copy_field(from: &Value, to: &mut Value, src: &[&str], dst: &[&str]) {
    if let Some(v) = get_value_by_path(from, src) {
        set_value_by_path(to, dst, &v);
    }
}

/// Convert a nested node and place the result at the destination path.
pub(crate) fn copy_converted(
    cfg: &ResolvedConfig,
    from: &Value,
    to: &mut Value,
    src: &[&str],
    dst: &[&str],
    converter: ConverterFn,
) -> Result<()> {
    if let Some(v) = get_value_by_path(from, src) {
        let converted = converter(cfg, &v, to)?;
        set_value_by_path(to, dst, &converted);
    }
    Ok(())
}

/// Convert a nested sequence element-by-element and place the result at the
/// destination path.
pub(crate) fn copy_converted_slice(
    cfg: &ResolvedConfig,
    from: &Value,
    to: &mut Value,
    src: &[&str],
    dst: &[&str],
    converter: ConverterFn,
) -> Result<()> {
    if let Some(v) = get_value_by_path(from, src) {
        let converted = apply_converter_to_slice(cfg, &v, to, converter)?;
        set_value_by_path(to, dst, &converted);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config(backend: crate::config::Backend) -> ResolvedConfig {
    use crate::config::{Backend, ClientConfig, StaticTokenProvider};
    use std::sync::Arc;
    match backend {
        Backend::GeminiApi => ClientConfig {
            api_key: Some("test-key".into()),
            ..Default::default()
        },
        Backend::VertexAi => ClientConfig {
            project: Some("test-project".into()),
            location: Some("us-central1".into()),
            credentials: Some(Arc::new(StaticTokenProvider("test-token".into()))),
            ..Default::default()
        },
    }
    .resolve()
    .expect("test config resolves")
}

//! Spec document loader
//!
//! Reads one spec document and, recursively, the documents it names in its
//! `parents` field:
//!
//! - `.json` files are parsed with serde_json, everything else as YAML
//! - parent paths are relative to the declaring document's directory
//! - parents load in listed order, before the document itself
//! - a missing parent or a parent cycle is FATAL
//!
//! The result is the flattened chain, lowest precedence first, ready for
//! [`merge_documents`](super::merger::merge_documents).

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use tracing::debug;

use super::errors::{SpecError, SpecResult};
use crate::observability::Event;

/// Document fields holding directories resolved against the document's folder
pub const DIRECTORY_FIELDS: [&str; 2] = ["sdtm_dir", "adam_dir"];

/// One parsed spec document
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    pub path: PathBuf,
    pub body: Value,
}

impl SpecDocument {
    /// In-memory document, used when specs are built programmatically
    pub fn from_value(body: Value) -> Self {
        Self {
            path: PathBuf::new(),
            body,
        }
    }

    /// Names listed in `parents` (a string or a list of strings)
    pub fn parents(&self) -> Vec<String> {
        match self.body.get("parents") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Loader for spec documents and their parent chains
pub struct SpecLoader;

impl SpecLoader {
    /// Loads `path` and all its ancestors, lowest precedence first
    pub fn load_chain(path: &Path) -> SpecResult<Vec<SpecDocument>> {
        let mut chain = Vec::new();
        let mut stack = Vec::new();
        Self::load_recursive(path, &mut stack, &mut chain)?;
        Ok(chain)
    }

    fn load_recursive(
        path: &Path,
        stack: &mut Vec<PathBuf>,
        chain: &mut Vec<SpecDocument>,
    ) -> SpecResult<()> {
        let identity = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if stack.contains(&identity) {
            return Err(SpecError::cycle(path));
        }

        let document = Self::load_document(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        stack.push(identity);
        for parent in document.parents() {
            let parent_path = base_dir.join(&parent);
            if !parent_path.is_file() {
                return Err(SpecError::parent_missing(path, &parent_path));
            }
            Self::load_recursive(&parent_path, stack, chain)?;
        }
        stack.pop();

        chain.push(document);
        Ok(())
    }

    /// Reads and parses a single document without following parents
    pub fn load_document(path: &Path) -> SpecResult<SpecDocument> {
        let content = fs::read_to_string(path).map_err(|e| SpecError::read_failed(path, e))?;
        let mut body = Self::parse(path, &content)?;

        if !body.is_object() {
            return Err(SpecError::read_failed(path, "document root must be a mapping"));
        }
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        resolve_directory_fields(&mut body, base_dir);

        debug!(
            event = Event::SpecLoaded.as_str(),
            path = %path.display(),
            "spec document loaded"
        );
        Ok(SpecDocument {
            path: path.to_path_buf(),
            body,
        })
    }

    fn parse(path: &Path, content: &str) -> SpecResult<Value> {
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(content).map_err(|e| SpecError::read_failed(path, e))
        } else {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| SpecError::read_failed(path, e))?;
            Ok(yaml_to_json(yaml))
        }
    }
}

/// Rewrites relative directory fields to paths under `base_dir`
fn resolve_directory_fields(body: &mut Value, base_dir: &Path) {
    let Some(obj) = body.as_object_mut() else {
        return;
    };
    for field in DIRECTORY_FIELDS {
        if let Some(Value::String(dir)) = obj.get_mut(field) {
            let candidate = Path::new(dir.as_str());
            if candidate.is_relative() {
                *dir = base_dir.join(candidate).to_string_lossy().into_owned();
            }
        }
    }
}

/// Converts YAML into ordered JSON; non-string keys are stringified
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let obj: Map<String, Value> = mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect();
            Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => {
            let tagged = *tagged;
            yaml_to_json(tagged.value)
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => yaml_to_json(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_yaml_keys_and_order_preserved() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            tmp.path(),
            "adsl.yaml",
            "domain: ADSL\ncut:\n  \"<18\": Peds\n  \">=65\": Elderly\n  1: one\n  ~: none\n",
        );
        let doc = SpecLoader::load_document(&path).unwrap();
        let cut = doc.body["cut"].as_object().unwrap();
        let keys: Vec<&str> = cut.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["<18", ">=65", "1", ""]);
    }

    #[test]
    fn test_json_document() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "adsl.json", r#"{"domain": "ADSL", "key": ["USUBJID"]}"#);
        let doc = SpecLoader::load_document(&path).unwrap();
        assert_eq!(doc.body["key"], json!(["USUBJID"]));
    }

    #[test]
    fn test_parent_chain_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "common/base.yaml", "domain: ADSL\n");
        write(tmp.path(), "common/project.yaml", "parents: base.yaml\nkey: [USUBJID]\n");
        let study = write(
            tmp.path(),
            "study.yaml",
            "parents:\n  - common/project.yaml\ndomain: ADSL\n",
        );

        let chain = SpecLoader::load_chain(&study).unwrap();
        let names: Vec<String> = chain
            .iter()
            .map(|d| d.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["base.yaml", "project.yaml", "study.yaml"]);
    }

    #[test]
    fn test_missing_parent_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let study = write(tmp.path(), "study.yaml", "parents: [nope.yaml]\n");
        let err = SpecLoader::load_chain(&study).unwrap_err();
        assert_eq!(err.code().code(), "ADAM_SPEC_PARENT_MISSING");
    }

    #[test]
    fn test_parent_cycle_detected() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.yaml", "parents: [b.yaml]\n");
        let b = write(tmp.path(), "b.yaml", "parents: [a.yaml]\n");
        let err = SpecLoader::load_chain(&b).unwrap_err();
        assert_eq!(err.code().code(), "ADAM_SPEC_CYCLE");
    }

    #[test]
    fn test_directory_fields_resolved_relative_to_document() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "spec/adsl.yaml", "sdtm_dir: ../data\nadam_dir: /abs/out\n");
        let doc = SpecLoader::load_document(&path).unwrap();
        let expected = tmp.path().join("spec").join("../data");
        assert_eq!(doc.body["sdtm_dir"], json!(expected.to_string_lossy()));
        assert_eq!(doc.body["adam_dir"], json!("/abs/out"));
    }

    #[test]
    fn test_malformed_document() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "bad.yaml", "- just\n- a list\n");
        let err = SpecLoader::load_document(&path).unwrap_err();
        assert_eq!(err.code().code(), "ADAM_SPEC_READ");
    }
}

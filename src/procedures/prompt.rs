//! Prompt procedure: named text templates with variable interpolation.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::rpc::procedure::{Params, Procedure};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid pattern"))
}

/// A registered prompt template.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub content: String,
    pub description: Option<String>,
}

impl Prompt {
    pub fn new(content: impl Into<String>, description: Option<String>) -> Self {
        Self {
            content: content.into(),
            description,
        }
    }

    /// Load prompt content from a file.
    pub fn from_file(path: &Path, description: Option<String>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("prompt file {}: {}", path.display(), e)))?;
        Ok(Self {
            content: content.trim_end().to_string(),
            description,
        })
    }

    /// Replace `{{variable}}` placeholders. Unknown variables are left
    /// verbatim so the caller can spot them.
    pub fn interpolate(&self, variables: &Map<String, Value>) -> String {
        placeholder_pattern()
            .replace_all(&self.content, |caps: &regex::Captures<'_>| {
                match variables.get(&caps[1]) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Procedure exposing `prompt.list` and `prompt.get`.
#[derive(Default)]
pub struct PromptProcedure {
    prompts: BTreeMap<String, Prompt>,
}

impl PromptProcedure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, prompt: Prompt) {
        self.prompts.insert(name.into(), prompt);
    }

    pub fn names(&self) -> Vec<String> {
        self.prompts.keys().cloned().collect()
    }

    fn list(&self) -> Value {
        let entries: Map<String, Value> = self
            .prompts
            .iter()
            .map(|(name, prompt)| {
                (
                    name.clone(),
                    json!({
                        "name": name,
                        "description": prompt.description,
                    }),
                )
            })
            .collect();
        Value::Object(entries)
    }

    fn get(&self, params: &Params) -> Result<Value> {
        let name = params.str_arg("name", 0)?;
        let variables = params.map_arg("variables", 1);

        let prompt = self
            .prompts
            .get(&name)
            .ok_or_else(|| Error::PromptNotFound(name.clone()))?;
        Ok(Value::String(prompt.interpolate(&variables)))
    }
}

#[async_trait]
impl Procedure for PromptProcedure {
    fn name(&self) -> &str {
        "prompt"
    }

    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        match method {
            "list" => Ok(self.list()),
            "get" => self.get(&params),
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn procedure() -> PromptProcedure {
        let mut procedure = PromptProcedure::new();
        procedure.register(
            "greeting",
            Prompt::new("Hello {{name}}, welcome to {{ app }}!", None),
        );
        procedure
    }

    #[tokio::test]
    async fn test_get_interpolates_variables() {
        let params = Params::new(Some(json!({
            "name": "greeting",
            "variables": {"name": "Ada", "app": "Bridge"}
        })));
        let result = procedure().call("get", params).await.unwrap();
        assert_eq!(result, "Hello Ada, welcome to Bridge!");
    }

    #[tokio::test]
    async fn test_unknown_variables_left_verbatim() {
        let params = Params::new(Some(json!({
            "name": "greeting",
            "variables": {"name": "Ada"}
        })));
        let result = procedure().call("get", params).await.unwrap();
        assert_eq!(result, "Hello Ada, welcome to {{ app }}!");
    }

    #[tokio::test]
    async fn test_non_string_variables_are_stringified() {
        let mut procedure = PromptProcedure::new();
        procedure.register("count", Prompt::new("n = {{n}}", None));
        let params = Params::new(Some(json!({"name": "count", "variables": {"n": 3}})));
        let result = procedure.call("get", params).await.unwrap();
        assert_eq!(result, "n = 3");
    }

    #[tokio::test]
    async fn test_get_unknown_prompt() {
        let params = Params::new(Some(json!({"name": "missing"})));
        let err = procedure().call("get", params).await.unwrap_err();
        assert!(matches!(err, Error::PromptNotFound(_)));
    }

    #[tokio::test]
    async fn test_list() {
        let result = procedure().call("list", Params::default()).await.unwrap();
        assert_eq!(result["greeting"]["name"], "greeting");
    }

    #[test]
    fn test_prompt_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "File prompt {{{{who}}}}").unwrap();

        let prompt = Prompt::from_file(file.path(), Some("from disk".to_string())).unwrap();
        assert_eq!(prompt.content, "File prompt {{who}}");

        let vars: Map<String, Value> = json!({"who": "me"}).as_object().unwrap().clone();
        assert_eq!(prompt.interpolate(&vars), "File prompt me");
    }

    #[test]
    fn test_prompt_from_missing_file() {
        assert!(Prompt::from_file(Path::new("/nonexistent/p.txt"), None).is_err());
    }
}

//! Built-in procedures: server, resource, tool, and prompt.

pub mod prompt;
pub mod resource;
pub mod server;
pub mod tool;

pub use prompt::{Prompt, PromptProcedure};
pub use resource::{ResourceHandler, ResourceProcedure, StaticResource};
pub use server::ServerProcedure;
pub use tool::{ToolDefinition, ToolHandler, ToolProcedure};

use std::sync::Arc;

use crate::config::{Manifest, PromptEntry};
use crate::error::Result;
use crate::rpc::procedure::ProcedureTable;
use crate::tools;

/// Build the four built-in procedures from a manifest and register them.
pub fn register_builtin(table: &mut ProcedureTable, manifest: &Manifest) -> Result<()> {
    let mut resources = ResourceProcedure::new();
    for (name, entry) in &manifest.resources {
        resources.register(
            name.clone(),
            Arc::new(StaticResource::new(
                name.clone(),
                entry.description.clone(),
                entry.data.clone(),
            )),
        );
    }

    let mut tool_procedure = ToolProcedure::new();
    tools::register_all(&mut tool_procedure);

    let mut prompts = PromptProcedure::new();
    for (name, entry) in &manifest.prompts {
        let prompt = match entry {
            PromptEntry::Inline(content) => Prompt::new(content.clone(), None),
            PromptEntry::File { file, description } => {
                Prompt::from_file(file, description.clone())?
            }
            PromptEntry::Full {
                content,
                description,
            } => Prompt::new(content.clone(), description.clone()),
        };
        prompts.register(name.clone(), prompt);
    }

    let resources = Arc::new(resources);
    let tool_procedure = Arc::new(tool_procedure);
    let prompts = Arc::new(prompts);

    table.register(Arc::new(ServerProcedure::new(
        manifest.identity(),
        Arc::clone(&resources),
        Arc::clone(&tool_procedure),
        Arc::clone(&prompts),
    )));
    table.register(resources);
    table.register(tool_procedure);
    table.register(prompts);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceEntry;
    use serde_json::json;

    #[test]
    fn test_register_builtin_installs_all_procedures() {
        let mut table = ProcedureTable::new();
        register_builtin(&mut table, &Manifest::default()).unwrap();

        assert_eq!(table.len(), 4);
        for name in ["server", "resource", "tool", "prompt"] {
            assert!(table.resolve(name).is_some(), "missing procedure {}", name);
        }
    }

    #[test]
    fn test_register_builtin_from_manifest() {
        let mut manifest = Manifest::default();
        manifest.prompts.insert(
            "welcome".to_string(),
            PromptEntry::Inline("Hi {{name}}".to_string()),
        );
        manifest.resources.insert(
            "status".to_string(),
            ResourceEntry {
                data: json!({"up": true}),
                description: Some("service status".to_string()),
            },
        );

        let mut table = ProcedureTable::new();
        register_builtin(&mut table, &manifest).unwrap();

        let prompt = table.resolve("prompt").unwrap();
        let reply = futures::executor::block_on(prompt.call(
            "get",
            crate::rpc::procedure::Params::new(Some(json!({
                "name": "welcome",
                "variables": {"name": "Ada"}
            }))),
        ))
        .unwrap();
        assert_eq!(reply, "Hi Ada");

        let resource = table.resolve("resource").unwrap();
        let reply = futures::executor::block_on(resource.call(
            "get",
            crate::rpc::procedure::Params::new(Some(json!({"name": "status"}))),
        ))
        .unwrap();
        assert_eq!(reply["up"], true);
    }

    #[test]
    fn test_register_builtin_missing_prompt_file() {
        let mut manifest = Manifest::default();
        manifest.prompts.insert(
            "broken".to_string(),
            PromptEntry::File {
                file: "/nonexistent/prompt.txt".into(),
                description: None,
            },
        );

        let mut table = ProcedureTable::new();
        assert!(register_builtin(&mut table, &manifest).is_err());
    }
}

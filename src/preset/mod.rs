use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod manager;

pub use manager::Manager;

/// One module's persisted state: enabled flag plus whichever parameter
/// values were saved. Missing parameters take their declared defaults
/// when the record is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub module: String,
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub modules: Vec<ModuleRecord>,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            name: "New Preset".to_string(),
            description: None,
            author: None,
            modules: Vec::new(),
        }
    }
}

impl Preset {
    pub fn new(name: String, modules: Vec<ModuleRecord>) -> Self {
        Self {
            name,
            description: None,
            author: None,
            modules,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_round_trip() {
        let mut params = BTreeMap::new();
        params.insert("drive".to_string(), 0.7);
        let preset = Preset::new(
            "Crunch".to_string(),
            vec![ModuleRecord {
                module: "amp".to_string(),
                enabled: true,
                params,
            }],
        )
        .with_author("someone");

        let json = serde_json::to_string(&preset).unwrap();
        let back: Preset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Crunch");
        assert_eq!(back.modules.len(), 1);
        assert_eq!(back.modules[0].params["drive"], 0.7);
    }

    #[test]
    fn missing_params_field_defaults_to_empty() {
        let json = r#"{"name":"Sparse","description":null,"author":null,
                       "modules":[{"module":"pedal","enabled":false}]}"#;
        let preset: Preset = serde_json::from_str(json).unwrap();
        assert!(preset.modules[0].params.is_empty());
        assert!(!preset.modules[0].enabled);
    }
}

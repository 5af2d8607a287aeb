use super::Preset;
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem store of presets, one JSON file per preset.
pub struct Manager {
    presets_dir: PathBuf,
    presets: Vec<Preset>,
}

impl Manager {
    pub fn new(preset_dir: &str) -> Result<Self> {
        let presets_dir = Path::new(preset_dir).to_path_buf();
        fs::create_dir_all(&presets_dir).context("Failed to create presets directory")?;

        let mut manager = Self {
            presets_dir,
            presets: Vec::new(),
        };

        manager.load_presets()?;

        Ok(manager)
    }

    pub fn load_presets(&mut self) -> Result<()> {
        self.presets.clear();

        if !self.presets_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.presets_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match load_preset_file(&path) {
                    Ok(preset) => self.presets.push(preset),
                    Err(e) => {
                        warn!("Failed to load preset {}: {e}", path.display());
                    }
                }
            }
        }

        // Sort presets by name
        self.presets.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(())
    }

    pub fn save_preset(&mut self, preset: &Preset) -> Result<()> {
        let filename = format!("{}.json", sanitize_filename(&preset.name));
        let path = self.presets_dir.join(filename);

        let json = serde_json::to_string_pretty(preset).context("Failed to serialize preset")?;

        fs::write(&path, json).context("Failed to write preset file")?;

        // Reload presets to include the new/updated one
        self.load_presets()?;

        Ok(())
    }

    pub fn delete_preset(&mut self, preset_name: &str) -> Result<()> {
        let filename = format!("{}.json", sanitize_filename(preset_name));
        let path = self.presets_dir.join(filename);

        if path.exists() {
            fs::remove_file(&path).context("Failed to delete preset file")?;

            // Reload presets to reflect the deletion
            self.load_presets()?;

            Ok(())
        } else {
            Err(anyhow::anyhow!("Preset file not found: {preset_name}"))
        }
    }

    pub fn preset_exists(&self, name: &str) -> bool {
        self.presets.iter().any(|p| p.name == name)
    }

    pub fn get_presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get_preset_by_name(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }
}

fn load_preset_file<P: AsRef<Path>>(path: P) -> Result<Preset> {
    let content = fs::read_to_string(path.as_ref()).context("Failed to read preset file")?;

    serde_json::from_str(&content).context("Failed to parse preset JSON")
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::ModuleRecord;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_preset(name: &str) -> Preset {
        let mut params = BTreeMap::new();
        params.insert("drive".to_string(), 0.6);
        Preset::new(
            name.to_string(),
            vec![ModuleRecord {
                module: "amp".to_string(),
                enabled: true,
                params,
            }],
        )
    }

    #[test]
    fn save_load_delete_cycle() -> Result<()> {
        let tmp = TempDir::new()?;
        let dir = tmp.path().join("presets");
        let mut manager = Manager::new(dir.to_str().unwrap())?;

        assert!(manager.get_presets().is_empty());

        manager.save_preset(&sample_preset("Clean Boost"))?;
        assert!(manager.preset_exists("Clean Boost"));
        let loaded = manager.get_preset_by_name("Clean Boost").unwrap();
        assert_eq!(loaded.modules[0].params["drive"], 0.6);

        manager.delete_preset("Clean Boost")?;
        assert!(!manager.preset_exists("Clean Boost"));

        Ok(())
    }

    #[test]
    fn corrupt_files_are_skipped() -> Result<()> {
        let tmp = TempDir::new()?;
        let dir = tmp.path().join("presets");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("broken.json"), "{nope")?;

        let mut manager = Manager::new(dir.to_str().unwrap())?;
        manager.save_preset(&sample_preset("Good"))?;

        assert_eq!(manager.get_presets().len(), 1);
        Ok(())
    }

    #[test]
    fn names_sort_alphabetically() -> Result<()> {
        let tmp = TempDir::new()?;
        let mut manager = Manager::new(tmp.path().join("p").to_str().unwrap())?;
        manager.save_preset(&sample_preset("Zeta"))?;
        manager.save_preset(&sample_preset("Alpha"))?;

        let names: Vec<&str> = manager.get_presets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        Ok(())
    }
}

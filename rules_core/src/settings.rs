use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What the table does when an edit points at a missing rule or a bad column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Leave the table untouched and return Ok.
    #[default]
    Ignore,
    /// Leave the table untouched and hand the error back.
    Report,
}

/// Behavior of re-selecting the row/column that is already selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Set,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub missing: MissingPolicy,
    pub selection: SelectionMode,
    pub initial_columns: usize,
    pub seed_sample: bool,
    pub new_row_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            missing: MissingPolicy::Ignore,
            selection: SelectionMode::Set,
            initial_columns: 2,
            seed_sample: true,
            new_row_filter: "New Filter".to_string(),
        }
    }
}

impl Settings {
    /// Column count a new table starts with; the primary column always exists.
    pub fn columns(&self) -> usize {
        self.initial_columns.max(1)
    }

    pub fn save_json_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize settings to json")?;
        fs::write(path.as_ref(), json).context("write settings json file")?;
        Ok(())
    }

    pub fn load_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path.as_ref()).context("read settings json file")?;
        let settings = serde_json::from_str::<Settings>(&text).context("parse settings json")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() -> anyhow::Result<()> {
        let s: Settings = serde_json::from_str(r#"{ "missing": "report" }"#)?;
        assert_eq!(s.missing, MissingPolicy::Report);
        assert_eq!(s.selection, SelectionMode::Set);
        assert_eq!(s.initial_columns, 2);
        assert!(s.seed_sample);
        assert_eq!(s.new_row_filter, "New Filter");
        Ok(())
    }

    #[test]
    fn zero_columns_clamps_to_primary() {
        let s = Settings {
            initial_columns: 0,
            ..Default::default()
        };
        assert_eq!(s.columns(), 1);
    }

    #[test]
    fn save_then_load_file() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("rules_settings_{}.json", std::process::id()));
        let s = Settings {
            selection: SelectionMode::Toggle,
            initial_columns: 3,
            ..Default::default()
        };
        s.save_json_file(&path)?;
        let back = Settings::load_json_file(&path)?;
        let _ = fs::remove_file(&path);
        assert_eq!(back, s);
        Ok(())
    }
}

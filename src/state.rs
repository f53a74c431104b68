use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub attribute: String,
    #[serde(default)]
    pub highlighted: Option<String>,
}

impl ViewState {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            highlighted: None,
        }
    }

    pub fn hover(&mut self, key: &str) {
        self.highlighted = Some(key.to_string());
    }

    // Leaving anything other than the highlighted key is a no-op.
    pub fn unhover(&mut self, key: &str) {
        if self.highlighted.as_deref() == Some(key) {
            self.highlighted = None;
        }
    }

    pub fn is_highlighted(&self, key: Option<&str>) -> bool {
        key.is_some() && key == self.highlighted.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    attributes: Vec<String>,
    current: usize,
}

impl Selection {
    pub fn new(attributes: Vec<String>) -> Result<Self> {
        if attributes.is_empty() {
            bail!("Attribute list is empty");
        }
        Ok(Self {
            attributes,
            current: 0,
        })
    }

    pub fn current(&self) -> &str {
        &self.attributes[self.current]
    }

    /// Returns whether the selection changed.
    pub fn select(&mut self, name: &str) -> Result<bool> {
        let Some(index) = self.attributes.iter().position(|a| a == name) else {
            bail!("Unknown attribute '{}'", name);
        };
        let changed = index != self.current;
        self.current = index;
        Ok(changed)
    }
}

//! Persisted contract address book.
//!
//! A flat JSON object mapping logical contract names to deployed addresses.
//! The deployment tooling rewrites the whole file after every successful
//! step, so saving always serializes the full book.

use {
    alloy::primitives::Address,
    anyhow::Context,
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, fs, io, path::Path},
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook(BTreeMap<String, Address>);

impl AddressBook {
    /// Loads the book from disk; a missing file is an empty book.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Malformed address book at {}", path.display())),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => {
                Err(error).with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }

    /// Overwrites the file with the whole book, pretty-printed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self).expect("Address book should serialize");
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn insert(&mut self, name: impl Into<String>, address: Address) {
        self.0.insert(name.into(), address);
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

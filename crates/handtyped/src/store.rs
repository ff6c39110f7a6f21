//! Persistence of [`BindingSet`]s.

use std::{
    cell::{Cell, RefCell},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::binding::BindingSet;

/// Storage the session loads its bindings from and writes every change back to.
pub trait BindingStore {
    /// Loads the stored bindings, or returns an empty set if nothing has been stored yet.
    fn load(&self) -> anyhow::Result<BindingSet>;

    /// Replaces the stored bindings with `bindings`.
    fn save(&self, bindings: &BindingSet) -> anyhow::Result<()>;
}

/// Stores bindings as a pretty-printed JSON file.
///
/// The file maps each gesture label to an object with `landmarks` (a list of `[x, y, z]`
/// triples) and `bound_key`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BindingStore for JsonFileStore {
    fn load(&self) -> anyhow::Result<BindingSet> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist, starting without bindings", self.path.display());
                return Ok(BindingSet::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        let bindings: BindingSet = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse bindings in {}", self.path.display()))?;
        log::debug!("loaded {} bindings from {}", bindings.len(), self.path.display());
        Ok(bindings)
    }

    /// Writes to a sibling file first and renames it over the old file, so an interrupted save
    /// leaves the previous bindings intact.
    fn save(&self, bindings: &BindingSet) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp = self.temp_path();
        let mut json = serde_json::to_string_pretty(bindings)?;
        json.push('\n');
        let mut file =
            fs::File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        log::debug!("saved {} bindings to {}", bindings.len(), self.path.display());
        Ok(())
    }
}

/// Keeps bindings in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bindings: RefCell<BindingSet>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new(bindings: BindingSet) -> Self {
        Self {
            bindings: bindings.into(),
            saves: Cell::new(0),
        }
    }

    /// Returns how often [`BindingStore::save`] has been called.
    pub fn saves(&self) -> usize {
        self.saves.get()
    }

    pub fn bindings(&self) -> BindingSet {
        self.bindings.borrow().clone()
    }
}

impl BindingStore for MemoryStore {
    fn load(&self) -> anyhow::Result<BindingSet> {
        Ok(self.bindings())
    }

    fn save(&self, bindings: &BindingSet) -> anyhow::Result<()> {
        *self.bindings.borrow_mut() = bindings.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

impl<S: BindingStore + ?Sized> BindingStore for &S {
    fn load(&self) -> anyhow::Result<BindingSet> {
        (**self).load()
    }

    fn save(&self, bindings: &BindingSet) -> anyhow::Result<()> {
        (**self).save(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binding::Binding, test};

    fn bindings() -> BindingSet {
        [
            Binding::new("fist", test::fist().normalize().unwrap(), "space").unwrap(),
            Binding::new("open", test::open_hand().normalize().unwrap(), "enter").unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("bindings.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/dir/bindings.json"));
        store.save(&bindings()).unwrap();

        assert_eq!(store.load().unwrap(), bindings());
        assert!(!store.temp_path().exists());

        let mut changed = bindings();
        changed.remove("fist");
        store.save(&changed).unwrap();
        assert_eq!(store.load().unwrap(), changed);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("bindings.json"), "{err:#}");
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStore::default();
        assert!(store.load().unwrap().is_empty());
        store.save(&bindings()).unwrap();
        store.save(&bindings()).unwrap();
        assert_eq!(store.saves(), 2);
        assert_eq!(store.load().unwrap(), bindings());
    }
}

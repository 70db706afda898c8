//! A JSON document tree that can only read or replace whole subtrees.
//!
//! Paths are '/'-separated keys, e.g. "budget_transactions" or "a/b/0".
//! Numeric segments index into arrays.

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use serde_json::{Map, Value};

use crate::Error;

/// A tree of JSON values addressed by path.
pub trait DocumentTree: Send + Sync {
    /// Read the subtree at `path`, or `None` if nothing is stored there.
    fn get(&self, path: &str) -> Result<Option<Value>, Error>;

    /// Replace the subtree at `path` with `value`.
    ///
    /// Setting [Value::Null] removes the subtree.
    fn set(&self, path: &str, value: Value) -> Result<(), Error>;
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn get_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;

    for segment in segments(path) {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    (!node.is_null()).then_some(node)
}

fn set_at(root: &mut Value, path: &str, value: Value) {
    let keys: Vec<&str> = segments(path).collect();

    let Some((last, parents)) = keys.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for key in parents {
        node = child_mut(node, key);
    }

    if let Value::Array(items) = node {
        if let Ok(index) = last.parse::<usize>() {
            if index < items.len() {
                items[index] = value;
                return;
            }
            if index == items.len() && !value.is_null() {
                items.push(value);
                return;
            }
        }
    }

    insert_into_object(node, last, value);
}

/// Get the child of `node` at `key`, turning `node` into an object first if needed.
fn child_mut<'a>(node: &'a mut Value, key: &str) -> &'a mut Value {
    let array_index = match node {
        Value::Array(items) => key
            .parse::<usize>()
            .ok()
            .filter(|index| *index < items.len()),
        _ => None,
    };

    if let Some(index) = array_index {
        return &mut node[index];
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }

    match node {
        Value::Object(map) => map
            .entry(key.to_owned())
            .or_insert_with(|| Value::Object(Map::new())),
        _ => unreachable!("node was replaced with an object above"),
    }
}

fn insert_into_object(node: &mut Value, key: &str, value: Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        if value.is_null() {
            map.remove(key);
        } else {
            map.insert(key.to_owned(), value);
        }
    }
}

/// A document tree held in memory. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct InMemoryTree {
    root: Mutex<Value>,
}

impl InMemoryTree {
    /// Create a tree holding `root`.
    pub fn new(root: Value) -> Self {
        Self {
            root: Mutex::new(root),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>, Error> {
        self.root.lock().map_err(|error| {
            tracing::error!("Could not acquire document tree lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl DocumentTree for InMemoryTree {
    fn get(&self, path: &str) -> Result<Option<Value>, Error> {
        Ok(get_at(&*self.lock()?, path).cloned())
    }

    fn set(&self, path: &str, value: Value) -> Result<(), Error> {
        set_at(&mut *self.lock()?, path, value);
        Ok(())
    }
}

/// A document tree stored as a single JSON file.
///
/// Every read loads the whole file and every write rewrites it. A missing
/// file is treated as an empty tree. Writes go to a sibling `.tmp` file that
/// is then renamed over the original, so a failed write leaves the previous
/// contents intact.
#[derive(Debug)]
pub struct JsonFileTree {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileTree {
    /// Create a tree backed by the JSON file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_root(&self) -> Result<Value, Error> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Value::Null),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Value::Null),
            Err(error) => Err(error.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        PathBuf::from(temp_path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, Error> {
        self.lock.lock().map_err(|error| {
            tracing::error!("Could not acquire document file lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl DocumentTree for JsonFileTree {
    fn get(&self, path: &str) -> Result<Option<Value>, Error> {
        let _guard = self.lock()?;
        let root = self.read_root()?;

        Ok(get_at(&root, path).cloned())
    }

    fn set(&self, path: &str, value: Value) -> Result<(), Error> {
        let _guard = self.lock()?;
        let mut root = self.read_root()?;

        set_at(&mut root, path, value);

        let temp_path = self.temp_path();
        fs::write(&temp_path, serde_json::to_vec_pretty(&root)?)?;
        fs::rename(&temp_path, &self.path)?;
        tracing::debug!("Wrote document tree to {}", self.path.display());

        Ok(())
    }
}

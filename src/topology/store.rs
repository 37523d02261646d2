//! Topology stores.
//!
//! A store holds topology documents keyed by name and notifies watchers of
//! every change, which is how the service registry learns to republish.

use crate::topology::model::{is_valid_name, Topology};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Trait for topology storage backends.
#[async_trait]
pub trait TopologyStore: Send + Sync {
    /// Insert or replace a topology. Its timestamp is set to now.
    async fn put(&self, topology: Topology) -> Result<Topology, StoreError>;

    /// Get a topology by name.
    async fn get(&self, name: &str) -> Result<Option<Topology>, StoreError>;

    /// List all topologies, sorted by name.
    async fn list(&self) -> Result<Vec<Topology>, StoreError>;

    /// Remove a topology.
    async fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Watch for changes to the store.
    async fn watch(&self) -> Result<mpsc::Receiver<StoreEvent>, StoreError>;
}

/// Events from a topology store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A topology was added.
    Added(String),
    /// A topology was replaced.
    Updated(String),
    /// A topology was removed.
    Removed(String),
}

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The name cannot be used for a topology.
    #[error("invalid topology name '{0}'")]
    InvalidName(String),
    /// No topology with this name exists.
    #[error("topology '{0}' not found")]
    NotFound(String),
    /// Reading or writing the backing files failed.
    #[error("topology store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A topology document could not be encoded or decoded.
    #[error("invalid topology document: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    /// HTTP-style status code for this error.
    pub fn code(&self) -> u16 {
        match self {
            StoreError::InvalidName(_) | StoreError::Serde(_) => 400,
            StoreError::NotFound(_) => 404,
            StoreError::Io(_) => 500,
        }
    }
}

fn check_name(name: &str) -> Result<(), StoreError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Senders of every `watch` call.
#[derive(Default)]
struct Watchers {
    senders: RwLock<Vec<mpsc::Sender<StoreEvent>>>,
}

impl Watchers {
    async fn subscribe(&self) -> mpsc::Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel(100);
        self.senders.write().await.push(tx);
        rx
    }

    async fn notify(&self, event: StoreEvent) {
        let mut senders = self.senders.write().await;
        senders.retain(|sender| !sender.is_closed());
        for sender in senders.iter() {
            let _ = sender.send(event.clone()).await;
        }
    }
}

/// In-memory topology store.
#[derive(Default)]
pub struct MemoryTopologyStore {
    entries: Arc<RwLock<HashMap<String, Topology>>>,
    watchers: Watchers,
}

impl MemoryTopologyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopologyStore for MemoryTopologyStore {
    async fn put(&self, mut topology: Topology) -> Result<Topology, StoreError> {
        check_name(&topology.name)?;
        topology.timestamp = current_timestamp();

        let name = topology.name.clone();
        let previous = self
            .entries
            .write()
            .await
            .insert(name.clone(), topology.clone());

        info!("Stored topology: {}", name);
        let event = match previous {
            Some(_) => StoreEvent::Updated(name),
            None => StoreEvent::Added(name),
        };
        self.watchers.notify(event).await;
        Ok(topology)
    }

    async fn get(&self, name: &str) -> Result<Option<Topology>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Topology>, StoreError> {
        let entries = self.entries.read().await;
        let mut topologies: Vec<Topology> = entries.values().cloned().collect();
        topologies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topologies)
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        info!("Removed topology: {}", name);
        self.watchers.notify(StoreEvent::Removed(name.to_string())).await;
        Ok(())
    }

    async fn watch(&self) -> Result<mpsc::Receiver<StoreEvent>, StoreError> {
        Ok(self.watchers.subscribe().await)
    }
}

/// Store keeping one `<name>.json` file per topology in a directory.
///
/// Writers are serialized so that concurrent puts of one name never share a
/// staging file and the added/updated event reflects the final state.
pub struct FileTopologyStore {
    dir: PathBuf,
    writes: Mutex<()>,
    watchers: Watchers,
}

impl FileTopologyStore {
    /// Open a store in `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Opened topology directory {}", dir.display());
        Ok(Self {
            dir,
            writes: Mutex::new(()),
            watchers: Watchers::default(),
        })
    }

    /// Directory holding the topology files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    async fn read(&self, path: &Path, name: &str) -> Result<Option<Topology>, StoreError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut topology: Topology = serde_json::from_slice(&content)?;
        if topology.name != name {
            warn!(
                "Topology file {} names '{}', using '{}'",
                path.display(),
                topology.name,
                name
            );
            topology.name = name.to_string();
        }
        Ok(Some(topology))
    }
}

#[async_trait]
impl TopologyStore for FileTopologyStore {
    async fn put(&self, mut topology: Topology) -> Result<Topology, StoreError> {
        check_name(&topology.name)?;
        let writing = self.writes.lock().await;
        topology.timestamp = current_timestamp();

        let path = self.file_for(&topology.name);
        let existed = tokio::fs::try_exists(&path).await?;

        // Write aside and rename so readers never see a partial file.
        let staging = self.dir.join(format!(".{}.json.tmp", topology.name));
        tokio::fs::write(&staging, serde_json::to_vec_pretty(&topology)?).await?;
        tokio::fs::rename(&staging, &path).await?;
        drop(writing);

        info!("Stored topology {} in {}", topology.name, path.display());
        let name = topology.name.clone();
        let event = if existed {
            StoreEvent::Updated(name)
        } else {
            StoreEvent::Added(name)
        };
        self.watchers.notify(event).await;
        Ok(topology)
    }

    async fn get(&self, name: &str) -> Result<Option<Topology>, StoreError> {
        if !is_valid_name(name) {
            return Ok(None);
        }
        self.read(&self.file_for(name), name).await
    }

    async fn list(&self) -> Result<Vec<Topology>, StoreError> {
        let mut topologies = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_valid_name(name) {
                continue;
            }
            match self.read(&path, name).await {
                Ok(Some(topology)) => topologies.push(topology),
                Ok(None) => {}
                Err(e) => warn!("Skipping topology file {}: {}", path.display(), e),
            }
        }

        topologies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topologies)
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        check_name(name)?;
        let writing = self.writes.lock().await;
        match tokio::fs::remove_file(self.file_for(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        drop(writing);

        info!("Removed topology: {}", name);
        self.watchers.notify(StoreEvent::Removed(name.to_string())).await;
        Ok(())
    }

    async fn watch(&self) -> Result<mpsc::Receiver<StoreEvent>, StoreError> {
        Ok(self.watchers.subscribe().await)
    }
}

/// Get current timestamp in milliseconds.
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

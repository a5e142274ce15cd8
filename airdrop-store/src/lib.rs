//! Airdrop Store
//!
//! Storage backends for participants and the campaign singleton.
//!
//! - [`MemoryStore`]: in-process maps, for tests and development
//! - [`SledStore`]: embedded persistent storage
//!
//! Both enforce wallet/post/handle uniqueness at insert time and apply
//! campaign slot changes atomically.

pub mod memory;
pub mod sled;

use std::path::PathBuf;
use std::sync::Arc;

use airdrop_core::{CampaignStore, CoreResult, ParticipantStore};

pub use self::sled::SledStore;
pub use memory::MemoryStore;

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Volatile, lost on exit
    Memory,
    /// Persistent at the given directory
    Sled { data_dir: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Shared handles to one backend through both store interfaces
#[derive(Clone)]
pub struct StoreHandles {
    pub participants: Arc<dyn ParticipantStore>,
    pub campaigns: Arc<dyn CampaignStore>,
}

/// Open the configured backend
pub fn open_store(config: &StoreConfig) -> CoreResult<StoreHandles> {
    match config {
        StoreConfig::Memory => {
            let store = Arc::new(MemoryStore::new());
            Ok(StoreHandles {
                participants: store.clone(),
                campaigns: store,
            })
        }
        StoreConfig::Sled { data_dir } => {
            let store = Arc::new(SledStore::open(data_dir)?);
            Ok(StoreHandles {
                participants: store.clone(),
                campaigns: store,
            })
        }
    }
}

//! dotai Catalog - remote asset discovery
//!
//! # Overview
//!
//! A registry publishes an `index.yaml` listing every installable asset
//! (agents, roles, contexts, tasks) with its module path and version. Each
//! asset's document lives next to the index unless the index says otherwise.
//!
//! ```text
//! Registry
//!     │
//!     ├── index.yaml                         ← one snapshot, fetched as a unit
//!     └── <module>/<version>.yaml            ← asset documents
//!            │
//!            ▼
//!     dotai CLI ── cache/index_<hash>.yaml   ← fingerprinted index cache
//!            │
//!            ▼
//!     <scope>/{agents,roles,contexts,tasks}.yaml
//! ```

mod index;
mod registry;

pub use index::{fingerprint, CatalogEntry, CatalogIndex, INDEX_API_VERSION};
pub use registry::{clear_cache, CachedIndex, FetchPolicy, Registry, RegistryTransport};

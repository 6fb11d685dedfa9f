//! # distilinit-hub
//!
//! Fetches teacher checkpoints from the Hugging Face Hub and keeps them in a
//! local cache with SHA-256 sidecars.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use distilinit_hub::{ModelCache, ModelDownloader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = ModelCache::default_cache()?;
//!     let downloader = ModelDownloader::new(cache)?;
//!     let dir = downloader.pull_checkpoint("bert-base-uncased", "main", None).await?;
//!     println!("Teacher cached in {}", dir.display());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod download;
pub mod error;
pub mod integrity;

pub use cache::{FileMetadata, ModelCache};
pub use download::{select_weight_files, ModelDownloader, WeightFiles};
pub use error::{HubError, HubResult};

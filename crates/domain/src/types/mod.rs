//! Domain types and models

pub mod bundle;
pub mod remote;
pub mod report;
pub mod repo;

pub use bundle::{BundlePath, FetchedFile};
pub use remote::{EntryKind, RemoteEntry};
pub use report::{FileFailure, InstallReport};
pub use repo::RepoSource;

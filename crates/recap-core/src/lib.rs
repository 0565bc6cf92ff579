pub mod branches;
pub mod error;
pub mod keys;
pub mod reconcile;
pub mod snapshot;
pub mod sources;
pub mod types;
pub mod window;

pub use branches::{BranchPolicy, BranchTier, PolicyError};
pub use error::{FailureKind, LocalHistoryError, RemoteError};
pub use reconcile::{Identity, ReconciledItem};
pub use snapshot::ActivitySnapshot;
pub use sources::{CodeHost, IssueTracker, LocalHistory};
pub use types::*;
pub use window::{ActivityWindow, WindowError};

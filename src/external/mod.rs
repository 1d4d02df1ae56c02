//! Collaborators reached over the network, behind traits so tests can swap them out.

pub mod identity;
pub mod storage;

pub use identity::{FacebookIdentity, IdentityError, IdentityProvider, ProviderIdentity};
pub use storage::{ObjectStore, PresignedUpload, S3Presigner, StorageError};

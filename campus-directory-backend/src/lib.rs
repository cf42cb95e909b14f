pub mod approval;
pub mod assignment;
pub mod error;
pub mod import;
pub mod integrity;
pub mod password;
pub mod requests;
pub mod service;
pub mod uniqueness;
pub mod validate;

pub use approval::ApprovalState;
pub use assignment::ClassHandle;
pub use error::{DirectoryError, ErrorKind};
pub use import::{import, ImportReport, Seed};
pub use password::{Argon2Hasher, CredentialHasher, Password};
pub use service::{ClassDetail, DirectoryService};

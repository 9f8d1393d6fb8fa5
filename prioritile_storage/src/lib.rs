//! Storage backends exposing "a hierarchy of `{z}/{x}/{y}.{format}` tile files" over local disks
//! and object storage.
//!
//! The merge engine only talks to [`StorageBackend`]; [`resolve_backend`] picks the
//! implementation for a command-line path spec.

mod backend;
pub use backend::*;

mod resolve;
pub use resolve::*;

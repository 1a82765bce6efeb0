//! This module provides builders for the Kubernetes objects a keyring is
//! stored in and consumed through.
//!
//! They are often not _pure_ builders but contain extra logic to set fields
//! based on others or to fill in sensible defaults.
pub mod meta;
pub mod volume;

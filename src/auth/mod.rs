//! Credential hashing, bearer tokens and the authenticated-caller extractor.

pub mod extractors;
pub mod jwt;
pub mod password;

#![doc = "gcs-transfer-core: reconciliation logic for daily S3 to GCS transfer jobs."]

//! This crate holds the data model, the remote collaborator traits and the
//! reconciliation pipeline. Transport clients live in the `gcs-transfer` crate.
//!
//! # Usage
//! Implement [`contract::ObjectStorage`] and [`contract::TransferScheduler`],
//! build a [`config::TransferConfig`] and call [`synchronise::synchronise`].

pub mod access;
pub mod config;
pub mod contract;
pub mod error;
pub mod job;
pub mod synchronise;

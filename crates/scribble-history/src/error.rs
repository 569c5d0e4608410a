//! Error types for the history engine.

use scribble_core::ElementId;
use thiserror::Error;

use crate::elements_change::Bucket;

/// Errors produced while building or replaying changes.
///
/// Everything else the engine runs into (missing elements, dangling label
/// references, empty stacks) is recovered locally and never surfaces here.
#[derive(Debug, Error)]
pub enum Error {
    /// A delta was filed under a bucket whose invariant it does not satisfy.
    #[error("elements change invariant broken for {bucket} delta of element \"{id}\"")]
    BrokenInvariant { bucket: Bucket, id: ElementId },

    /// The same element id was filed under more than one bucket.
    #[error("element \"{id}\" appears in both the {first} and {second} buckets")]
    DuplicateElement {
        id: ElementId,
        first: Bucket,
        second: Bucket,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

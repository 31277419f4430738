pub mod client;

pub use client::{ObjectInfo, ObjectStore, S3Client};

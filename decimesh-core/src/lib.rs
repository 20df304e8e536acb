//! Core data structures for decimesh
//!
//! This crate provides the triangle mesh value exchanged between the loaders,
//! the decimation engine and the writers, together with the shared error type.

pub mod point;
pub mod mesh;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, Matrix4, Vector4};

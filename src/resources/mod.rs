//! Resource management
//!
//! Handles loading and management of meshes, textures, and materials.

mod mesh;
mod material;
mod texture;

pub use mesh::*;
pub use material::*;
pub use texture::*;

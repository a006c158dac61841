//! nui-export library
//!
//! Compiles model files (glTF/GLB/OBJ) into `.nui` runtime assets. Used by
//! the `nui-export` binary and available to other build tools.

pub mod animation;
pub mod batch;
pub mod compile;
pub mod config;
pub mod import;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skeleton;

// Re-export the pipeline entry points
pub use batch::{build_directory, needs_rebuild, output_path_for, BuildReport};
pub use compile::{build_model, compile_file, compile_scene};
pub use config::ExportConfig;
pub use import::{import_scene, is_supported, SUPPORTED_EXTENSIONS};
pub use mesh::ExtractError;
pub use scene::Scene;

// Re-export the format crate for callers that decode output
pub use nui_common;

//! Shader binding constants.
//!
//! Binding numbers shared between Rust code and `shaders/quad.wgsl`. Keep the
//! two in sync:
//!
//! ```wgsl
//! @group(0) @binding(0)  // UNIFORM_GROUP, UNIFORM_TRANSFORM_BINDING
//! var<uniform> transform: mat3x3<f32>;
//! ```

/// Group 0: per-draw transform, bound with a dynamic offset.
pub const UNIFORM_GROUP: u32 = 0;
/// Binding 0 in group 0: transform matrix uniform
pub const UNIFORM_TRANSFORM_BINDING: u32 = 0;

/// Group 1: texture resources
pub const TEXTURE_GROUP: u32 = 1;
/// Binding 0 in group 1: Texture 2D
pub const TEXTURE_BINDING: u32 = 0;
/// Binding 1 in group 1: Sampler
pub const SAMPLER_BINDING: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_distinct() {
        assert_ne!(UNIFORM_GROUP, TEXTURE_GROUP);
        assert_ne!(TEXTURE_BINDING, SAMPLER_BINDING);
    }

    #[test]
    fn test_shader_declares_bindings() {
        let src = include_str!("shaders/quad.wgsl");
        assert!(src.contains(&format!(
            "@group({}) @binding({})",
            UNIFORM_GROUP, UNIFORM_TRANSFORM_BINDING
        )));
        assert!(src.contains(&format!("@group({}) @binding({})", TEXTURE_GROUP, TEXTURE_BINDING)));
        assert!(src.contains(&format!("@group({}) @binding({})", TEXTURE_GROUP, SAMPLER_BINDING)));
    }
}

use std::fmt::Debug;

use crate::error::{RenderError, ShaderStage};

/// Canonical handle names resolved by `ShaderProgram`. Backends map these
/// onto their own reflection scheme.
pub const ATTRIB_POSITION: &str = "a_position";
pub const UNIFORM_TRANSFORM: &str = "u_transform";
pub const UNIFORM_FILL_COLOR: &str = "u_fill_color";

/// The engine's only view of a GPU: an immediate-mode device owning one
/// render target.
///
/// Frame protocol: `begin_frame` clears the target, then any number of
/// upload/uniform/draw calls, then `end_frame` presents. Resource handles
/// are plain copyable ids; double-deleting or using a deleted handle is a
/// caller bug and backends may ignore it.
pub trait RenderDevice {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Buffer: Copy + Debug;
    type Attrib: Copy + Debug;
    type Uniform: Copy + Debug;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self::Shader, RenderError>;

    fn link_program(
        &mut self,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> Result<Self::Program, RenderError>;

    /// `None` means the handle does not exist in the linked program; the
    /// program manager treats that as fatal.
    fn attrib_location(&mut self, program: Self::Program, name: &str) -> Option<Self::Attrib>;
    fn uniform_location(&mut self, program: Self::Program, name: &str) -> Option<Self::Uniform>;

    fn create_vertex_buffer(&mut self) -> Result<Self::Buffer, RenderError>;

    fn resize(&mut self, width_px: u32, height_px: u32);
    fn begin_frame(&mut self, clear_color: [f32; 4]);

    /// Replace the buffer contents with interleaved x,y pairs.
    fn upload_vertices(&mut self, buffer: Self::Buffer, xy: &[f32]);
    fn set_uniform_vec4(&mut self, uniform: Self::Uniform, value: [f32; 4]);

    /// Draw `vertex_count` vertices from `buffer` as a triangle fan with the
    /// current uniform values.
    fn draw_triangle_fan(
        &mut self,
        program: Self::Program,
        buffer: Self::Buffer,
        position: Self::Attrib,
        vertex_count: u32,
    );

    fn end_frame(&mut self);

    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn delete_program(&mut self, program: Self::Program);
}

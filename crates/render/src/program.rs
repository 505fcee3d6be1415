use crate::device::{
    ATTRIB_POSITION, RenderDevice, UNIFORM_FILL_COLOR, UNIFORM_TRANSFORM,
};
use crate::error::{RenderError, ShaderStage};

/// Vertex stage: applies the world-pixel → NDC affine packed as
/// (scale.xy, translate.xy).
pub const VERTEX_SHADER: &str = r#"
struct Globals {
    transform: vec4<f32>,
    fill_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    let ndc = position * globals.transform.xy + globals.transform.zw;
    return vec4<f32>(ndc, 0.0, 1.0);
}
"#;

/// Fragment stage: flat uniform fill color.
pub const FRAGMENT_SHADER: &str = r#"
struct Globals {
    transform: vec4<f32>,
    fill_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return globals.fill_color;
}
"#;

/// The engine's single shader program plus its resolved handles and the one
/// reusable vertex buffer. Built once per engine instance; any failure here
/// is fatal and prevents the engine from existing.
#[derive(Debug)]
pub struct ShaderProgram<D: RenderDevice> {
    pub program: D::Program,
    pub a_position: D::Attrib,
    pub u_transform: D::Uniform,
    pub u_fill_color: D::Uniform,
    pub vertex_buffer: D::Buffer,
}

impl<D: RenderDevice> ShaderProgram<D> {
    pub fn new(device: &mut D) -> Result<Self, RenderError> {
        let vertex = device.compile_shader(ShaderStage::Vertex, VERTEX_SHADER)?;
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT_SHADER)?;
        let program = device.link_program(vertex, fragment)?;

        // A null handle here is a programming/build error, never recoverable.
        let a_position = device
            .attrib_location(program, ATTRIB_POSITION)
            .ok_or_else(|| RenderError::MissingUniform {
                name: ATTRIB_POSITION.to_string(),
            })?;
        let u_transform = device
            .uniform_location(program, UNIFORM_TRANSFORM)
            .ok_or_else(|| RenderError::MissingUniform {
                name: UNIFORM_TRANSFORM.to_string(),
            })?;
        let u_fill_color = device
            .uniform_location(program, UNIFORM_FILL_COLOR)
            .ok_or_else(|| RenderError::MissingUniform {
                name: UNIFORM_FILL_COLOR.to_string(),
            })?;

        let vertex_buffer = device.create_vertex_buffer()?;

        Ok(Self {
            program,
            a_position,
            u_transform,
            u_fill_color,
            vertex_buffer,
        })
    }

    pub fn dispose(&self, device: &mut D) {
        device.delete_buffer(self.vertex_buffer);
        device.delete_program(self.program);
    }
}

//! A headless `RenderDevice` that records every call instead of talking to
//! a GPU. Used by the engine's tests and handy for debugging draw order;
//! supports injecting each fatal construction failure.

use std::collections::HashMap;

use crate::device::RenderDevice;
use crate::error::{RenderError, ShaderStage};

#[derive(Debug, Clone, PartialEq)]
pub enum FailPoint {
    Compile,
    Link,
    MissingHandle(String),
    BufferAllocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CompileShader(ShaderStage),
    LinkProgram,
    Resize(u32, u32),
    BeginFrame([f32; 4]),
    Upload { buffer: u32, xy: Vec<f32> },
    Uniform { handle: u32, value: [f32; 4] },
    DrawFan { buffer: u32, vertex_count: u32 },
    EndFrame,
    DeleteBuffer(u32),
    DeleteProgram(u32),
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    fail: Option<FailPoint>,
    next_id: u32,
    handles: HashMap<String, u32>,
    pub events: Vec<Event>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(fail: FailPoint) -> Self {
        Self {
            fail: Some(fail),
            ..Self::default()
        }
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn handle_for(&mut self, name: &str) -> u32 {
        if let Some(id) = self.handles.get(name) {
            return *id;
        }
        let id = self.alloc_id();
        self.handles.insert(name.to_string(), id);
        id
    }

    pub fn last_upload(&self) -> Option<&[f32]> {
        self.events.iter().rev().find_map(|e| match e {
            Event::Upload { xy, .. } => Some(xy.as_slice()),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::DrawFan { .. }))
            .count()
    }

    pub fn buffer_deleted(&self, buffer: u32) -> bool {
        self.events.contains(&Event::DeleteBuffer(buffer))
    }

    pub fn program_deleted(&self, program: u32) -> bool {
        self.events.contains(&Event::DeleteProgram(program))
    }
}

impl RenderDevice for RecordingDevice {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type Attrib = u32;
    type Uniform = u32;

    fn compile_shader(&mut self, stage: ShaderStage, _source: &str) -> Result<u32, RenderError> {
        if self.fail == Some(FailPoint::Compile) {
            return Err(RenderError::ShaderCompile {
                stage,
                log: "injected compile failure".to_string(),
            });
        }
        self.events.push(Event::CompileShader(stage));
        Ok(self.alloc_id())
    }

    fn link_program(&mut self, _vertex: u32, _fragment: u32) -> Result<u32, RenderError> {
        if self.fail == Some(FailPoint::Link) {
            return Err(RenderError::ProgramLink {
                log: "injected link failure".to_string(),
            });
        }
        self.events.push(Event::LinkProgram);
        Ok(self.alloc_id())
    }

    fn attrib_location(&mut self, _program: u32, name: &str) -> Option<u32> {
        if self.fail == Some(FailPoint::MissingHandle(name.to_string())) {
            return None;
        }
        Some(self.handle_for(name))
    }

    fn uniform_location(&mut self, _program: u32, name: &str) -> Option<u32> {
        if self.fail == Some(FailPoint::MissingHandle(name.to_string())) {
            return None;
        }
        Some(self.handle_for(name))
    }

    fn create_vertex_buffer(&mut self) -> Result<u32, RenderError> {
        if self.fail == Some(FailPoint::BufferAllocation) {
            return Err(RenderError::BufferAllocation {
                reason: "injected allocation failure".to_string(),
            });
        }
        Ok(self.alloc_id())
    }

    fn resize(&mut self, width_px: u32, height_px: u32) {
        self.events.push(Event::Resize(width_px, height_px));
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.events.push(Event::BeginFrame(clear_color));
    }

    fn upload_vertices(&mut self, buffer: u32, xy: &[f32]) {
        self.events.push(Event::Upload {
            buffer,
            xy: xy.to_vec(),
        });
    }

    fn set_uniform_vec4(&mut self, uniform: u32, value: [f32; 4]) {
        self.events.push(Event::Uniform {
            handle: uniform,
            value,
        });
    }

    fn draw_triangle_fan(&mut self, _program: u32, buffer: u32, _position: u32, vertex_count: u32) {
        self.events.push(Event::DrawFan {
            buffer,
            vertex_count,
        });
    }

    fn end_frame(&mut self) {
        self.events.push(Event::EndFrame);
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.events.push(Event::DeleteBuffer(buffer));
    }

    fn delete_program(&mut self, program: u32) {
        self.events.push(Event::DeleteProgram(program));
    }
}

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Fatal GPU setup failures. All of these surface from engine construction;
/// none of them is recoverable at runtime (they indicate a broken build or
/// an unsupported host, not a transient condition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No usable graphics context/adapter on this host.
    ContextUnavailable(String),
    /// Shader failed to compile; `log` carries the backend diagnostic.
    ShaderCompile { stage: ShaderStage, log: String },
    /// Program link/pipeline creation failed.
    ProgramLink { log: String },
    /// A required attribute or uniform handle resolved to nothing.
    MissingUniform { name: String },
    /// Vertex buffer allocation failed.
    BufferAllocation { reason: String },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ContextUnavailable(reason) => {
                write!(f, "graphics context unavailable: {reason}")
            }
            RenderError::ShaderCompile { stage, log } => {
                write!(f, "{stage} shader failed to compile: {log}")
            }
            RenderError::ProgramLink { log } => write!(f, "program failed to link: {log}"),
            RenderError::MissingUniform { name } => {
                write!(f, "shader handle {name:?} not found (build error)")
            }
            RenderError::BufferAllocation { reason } => {
                write!(f, "vertex buffer allocation failed: {reason}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::{RenderError, ShaderStage};

    #[test]
    fn messages_carry_backend_logs() {
        let e = RenderError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "expected ';'".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("fragment"));
        assert!(msg.contains("expected ';'"));
    }
}

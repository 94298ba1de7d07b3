//! Named shader programs.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::{Device, ShaderModule};

use crate::render::config::{DEFAULT_FRAGMENT_PROGRAM, DEFAULT_VERTEX_PROGRAM};
use crate::render::ProgramRegistry;

/// A compiled module plus the entry point that implements one program.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub module: Arc<ShaderModule>,
    pub entry_point: String,
}

/// Program name to module and entry point.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    programs: HashMap<String, ShaderProgram>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in lattice programs.
    pub fn with_builtin(device: &Device) -> Self {
        let mut registry = Self::new();
        registry.register_wgsl(
            device,
            "lattice_shader",
            include_str!("shaders/lattice.wgsl"),
            &[DEFAULT_VERTEX_PROGRAM, DEFAULT_FRAGMENT_PROGRAM],
        );
        registry
    }

    /// Compile `source` and register each entry point under its own name.
    pub fn register_wgsl(&mut self, device: &Device, label: &str, source: &str, entry_points: &[&str]) {
        let module = Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }));
        for entry in entry_points {
            self.register(*entry, Arc::clone(&module), *entry);
        }
    }

    /// Register an entry point of an existing module under `name`.
    pub fn register(&mut self, name: impl Into<String>, module: Arc<ShaderModule>, entry_point: impl Into<String>) {
        let name = name.into();
        log::debug!("Registered shader program '{}'", name);
        self.programs.insert(
            name,
            ShaderProgram {
                module,
                entry_point: entry_point.into(),
            },
        );
    }
}

impl ProgramRegistry for ShaderRegistry {
    type Program = ShaderProgram;

    fn resolve(&self, name: &str) -> Option<ShaderProgram> {
        self.programs.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[tokio::test]
    async fn test_builtin_programs_resolve() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let registry = ShaderRegistry::with_builtin(&ctx.device);
        assert!(registry.resolve(DEFAULT_VERTEX_PROGRAM).is_some());
        assert!(registry.resolve(DEFAULT_FRAGMENT_PROGRAM).is_some());
        assert!(registry.resolve("missing_program").is_none());
    }
}

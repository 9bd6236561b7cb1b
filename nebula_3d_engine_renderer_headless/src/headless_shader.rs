/// Shader - headless implementation of the renderer Shader trait
///
/// Validates the uniform engine's calls the way a real backend's
/// validation layer would: instance slots must be acquired before use,
/// sampler locations must be in range, push constants must fit the
/// declared size. Descriptor flushes feed the shared stats.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashSet;

use nebula_3d_engine::engine_bail;
use nebula_3d_engine::nebula3d::render::{
    Shader as RendererShader, ShaderDesc, Texture as RendererTexture, UniformRange,
};
use nebula_3d_engine::nebula3d::Result;

use crate::headless::BackendStats;

/// Headless shader: validation state + flush counting
pub struct Shader {
    desc: ShaderDesc,
    live_instances: Mutex<FxHashSet<u32>>,
    stats: Arc<BackendStats>,
}

impl Shader {
    pub(crate) fn new(desc: ShaderDesc, stats: Arc<BackendStats>) -> Self {
        Self {
            desc,
            live_instances: Mutex::new(FxHashSet::default()),
            stats,
        }
    }

    /// Number of live instance slots (test inspection)
    pub fn live_instance_count(&self) -> usize {
        self.live_instances.lock().unwrap().len()
    }
}

impl RendererShader for Shader {
    fn bind(&self) -> Result<()> {
        Ok(())
    }

    fn apply_globals(&self, range: UniformRange) -> Result<()> {
        if range.size < self.desc.global_ubo_size {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': global range {} smaller than declared block {}",
                self.desc.name,
                range.size,
                self.desc.global_ubo_size
            );
        }
        self.stats.descriptor_updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn apply_instance(&self, instance_id: u32, range: UniformRange) -> Result<()> {
        if !self.live_instances.lock().unwrap().contains(&instance_id) {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': apply_instance({}) without acquired resources",
                self.desc.name,
                instance_id
            );
        }
        if range.size < self.desc.instance_ubo_stride {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': instance range {} smaller than stride {}",
                self.desc.name,
                range.size,
                self.desc.instance_ubo_stride
            );
        }
        self.stats.descriptor_updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn push_constants(&self, offset: u32, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u32;
        if end > self.desc.push_constant_size {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': push constants [{}, {}) exceed declared size {}",
                self.desc.name,
                offset,
                end,
                self.desc.push_constant_size
            );
        }
        Ok(())
    }

    fn acquire_instance_resources(&self, instance_id: u32) -> Result<()> {
        let mut live = self.live_instances.lock().unwrap();
        if !live.insert(instance_id) {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': instance {} acquired twice",
                self.desc.name,
                instance_id
            );
        }
        Ok(())
    }

    fn release_instance_resources(&self, instance_id: u32) -> Result<()> {
        if !self.live_instances.lock().unwrap().remove(&instance_id) {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': release of unacquired instance {}",
                self.desc.name,
                instance_id
            );
        }
        Ok(())
    }

    fn bind_global_texture(&self, location: u32, _texture: &Arc<dyn RendererTexture>) -> Result<()> {
        if location >= self.desc.global_texture_count {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': global sampler location {} out of range ({} declared)",
                self.desc.name,
                location,
                self.desc.global_texture_count
            );
        }
        Ok(())
    }

    fn bind_instance_texture(
        &self,
        instance_id: u32,
        location: u32,
        _texture: &Arc<dyn RendererTexture>,
    ) -> Result<()> {
        if !self.live_instances.lock().unwrap().contains(&instance_id) {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': sampler bind on unacquired instance {}",
                self.desc.name,
                instance_id
            );
        }
        if location >= self.desc.instance_texture_count {
            engine_bail!(
                "nebula3d::headless::Shader",
                "'{}': instance sampler location {} out of range ({} declared)",
                self.desc.name,
                location,
                self.desc.instance_texture_count
            );
        }
        Ok(())
    }
}

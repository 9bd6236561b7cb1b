/// Shader uniform binding state machine.
///
/// A `Shader` owns a compiled shader's parameter layout and enforces the
/// protocol that synchronizes CPU-side parameter writes with GPU-visible
/// memory:
///
/// 1. `bind()` activates the pipeline
/// 2. `bind_globals()` selects the Global scope
/// 3. `set_uniform(..)` any number of times (mismatched scopes auto-rebind)
/// 4. `apply_globals(frame)` flushes — idempotent within one frame number
/// 5. `bind_instance(id)` then steps 3-4 via `apply_instance(frame)`
/// 6. Local-scope uniforms bypass the UBO and write push constants
///    immediately on `set_uniform`
///
/// Lifecycle: `Uninitialized -> Initializing -> Initialized -> Destroying
/// -> Destroyed`. Uniform registration is only legal while `Initializing`;
/// any failure during `initialize()` lands the shader in `Destroyed`.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::renderer::{
    self, AllocationRef, DeviceLimits, RenderBuffer, RenderBufferType, ShaderDesc, UniformRange,
};
use crate::shader::{ShaderScope, ShaderUniform, UniformType, UniformValue};
use crate::{engine_bail, engine_debug, engine_err, engine_error, engine_warn};

/// Instance slots reserved when a shader initializes; grows by doubling
pub const INITIAL_INSTANCE_CAPACITY: usize = 4;

/// Shader lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    Uninitialized,
    Initializing,
    Initialized,
    Destroying,
    Destroyed,
}

/// Per-shader limits, handed down from the shader system config
#[derive(Debug, Clone, Copy)]
pub struct ShaderLimits {
    pub max_uniform_count: u16,
    pub max_global_textures: u32,
    pub max_instance_textures: u32,
}

/// A per-object GPU resource slot within a shader
///
/// Holds the instance's UBO lease and its apply-gating frame number.
#[derive(Debug)]
pub struct ShaderInstance {
    /// Lease into the shader's uniform buffer (None when the shader has no
    /// instance-scope value uniforms)
    alloc: Option<AllocationRef>,
    /// Frame number of the last backend flush, for apply idempotence
    last_update_frame: Option<u64>,
}

/// Frontend shader: uniform layout + binding state machine
pub struct Shader {
    name: String,
    state: ShaderState,
    renderer: Arc<Mutex<dyn renderer::Renderer>>,
    limits: ShaderLimits,
    device_limits: DeviceLimits,

    uniforms: Vec<ShaderUniform>,
    uniform_names: FxHashMap<String, u16>,

    /// Packed size of Global value uniforms (unaligned)
    global_ubo_size: u64,
    /// Global block size padded to the device UBO alignment
    global_ubo_stride: u64,
    /// Packed size of Instance value uniforms (unaligned)
    instance_ubo_size: u64,
    /// Instance region granularity, padded to the device UBO alignment
    instance_ubo_stride: u64,

    /// Total push-constant bytes consumed (4-byte aligned sub-ranges)
    push_constant_size: u32,
    /// (offset, size) of each Local-scope uniform's sub-range
    push_constant_ranges: Vec<(u32, u32)>,

    global_texture_count: u32,
    instance_texture_count: u32,
    global_texture_maps: Vec<Option<Arc<dyn renderer::Texture>>>,
    /// Sized `instances.len() * instance_texture_count`, kept in sync with
    /// instance capacity growth
    instance_texture_maps: Vec<Option<Arc<dyn renderer::Texture>>>,

    backend: Option<Arc<dyn renderer::Shader>>,
    uniform_buffer: Option<RenderBuffer>,
    global_alloc: Option<AllocationRef>,

    instances: Vec<Option<ShaderInstance>>,
    instance_count: u32,

    bound_scope: ShaderScope,
    /// Sticky: survives bind_globals so mixed-scope sets can auto-rebind
    bound_instance: Option<u32>,
    global_last_update_frame: Option<u64>,
}

fn align_up(value: u64, granularity: u64) -> u64 {
    if granularity == 0 {
        return value;
    }
    (value + granularity - 1) / granularity * granularity
}

impl Shader {
    /// Create a shader in the `Initializing` state.
    ///
    /// Register uniforms with [`add_uniform`](Self::add_uniform) /
    /// [`add_sampler`](Self::add_sampler), then call
    /// [`initialize`](Self::initialize).
    pub fn new(
        renderer: Arc<Mutex<dyn renderer::Renderer>>,
        name: impl Into<String>,
        limits: ShaderLimits,
    ) -> Self {
        let device_limits = renderer.lock().unwrap().device_limits();
        Self {
            name: name.into(),
            state: ShaderState::Initializing,
            renderer,
            limits,
            device_limits,
            uniforms: Vec::new(),
            uniform_names: FxHashMap::default(),
            global_ubo_size: 0,
            global_ubo_stride: 0,
            instance_ubo_size: 0,
            instance_ubo_stride: 0,
            push_constant_size: 0,
            push_constant_ranges: Vec::new(),
            global_texture_count: 0,
            instance_texture_count: 0,
            global_texture_maps: Vec::new(),
            instance_texture_maps: Vec::new(),
            backend: None,
            uniform_buffer: None,
            global_alloc: None,
            instances: Vec::new(),
            instance_count: 0,
            bound_scope: ShaderScope::Global,
            bound_instance: None,
            global_last_update_frame: None,
        }
    }

    // ===== UNIFORM REGISTRATION (Initializing only) =====

    /// Register a value uniform, packing it at the next free offset within
    /// its scope's backing store. Returns the uniform id.
    pub fn add_uniform(
        &mut self,
        name: impl Into<String>,
        scope: ShaderScope,
        utype: UniformType,
    ) -> Result<u16> {
        let name = name.into();
        self.check_can_add(&name)?;
        if utype.is_sampler() {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': '{}' is a sampler, use add_sampler",
                self.name,
                name
            );
        }

        let size = utype.size();
        let index = self.uniforms.len() as u16;

        let offset = match scope {
            ShaderScope::Global => {
                let offset = self.global_ubo_size;
                self.global_ubo_size += size;
                offset
            }
            ShaderScope::Instance => {
                let offset = self.instance_ubo_size;
                self.instance_ubo_size += size;
                offset
            }
            ShaderScope::Local => {
                // Push-constant sub-ranges are 4-byte aligned and consumed
                // contiguously.
                let aligned = ((size as u32) + 3) & !3;
                let offset = self.push_constant_size;
                if offset + aligned > self.device_limits.max_push_constant_size {
                    let msg = format!(
                        "shader '{}': push-constant range ({} + {} bytes exceeds limit {})",
                        self.name, offset, aligned, self.device_limits.max_push_constant_size
                    );
                    engine_error!("nebula3d::Shader", "Capacity exhausted: {}", msg);
                    return Err(Error::CapacityExhausted(msg));
                }
                self.push_constant_ranges.push((offset, aligned));
                self.push_constant_size += aligned;
                offset as u64
            }
        };

        self.uniforms.push(ShaderUniform {
            name: name.clone(),
            index,
            scope,
            utype,
            offset,
            size,
            location: index as u32,
        });
        self.uniform_names.insert(name, index);
        Ok(index)
    }

    /// Register a sampler uniform. Samplers carry no UBO storage; their
    /// `location` indexes the scope's texture-map array. Returns the
    /// uniform id.
    pub fn add_sampler(&mut self, name: impl Into<String>, scope: ShaderScope) -> Result<u16> {
        let name = name.into();
        self.check_can_add(&name)?;

        let location = match scope {
            ShaderScope::Global => {
                if self.global_texture_count >= self.limits.max_global_textures {
                    let msg = format!(
                        "shader '{}': global samplers (max {})",
                        self.name, self.limits.max_global_textures
                    );
                    engine_error!("nebula3d::Shader", "Capacity exhausted: {}", msg);
                    return Err(Error::CapacityExhausted(msg));
                }
                let location = self.global_texture_count;
                self.global_texture_count += 1;
                location
            }
            ShaderScope::Instance => {
                if self.instance_texture_count >= self.limits.max_instance_textures {
                    let msg = format!(
                        "shader '{}': instance samplers (max {})",
                        self.name, self.limits.max_instance_textures
                    );
                    engine_error!("nebula3d::Shader", "Capacity exhausted: {}", msg);
                    return Err(Error::CapacityExhausted(msg));
                }
                let location = self.instance_texture_count;
                self.instance_texture_count += 1;
                location
            }
            ShaderScope::Local => {
                engine_bail!(
                    "nebula3d::Shader",
                    "Shader '{}': samplers cannot use Local scope",
                    self.name
                );
            }
        };

        let index = self.uniforms.len() as u16;
        self.uniforms.push(ShaderUniform {
            name: name.clone(),
            index,
            scope,
            utype: UniformType::Sampler,
            offset: 0,
            size: 0,
            location,
        });
        self.uniform_names.insert(name, index);
        Ok(index)
    }

    fn check_can_add(&self, name: &str) -> Result<()> {
        if self.state != ShaderState::Initializing {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': uniform registration only legal while Initializing (state: {:?})",
                self.name,
                self.state
            );
        }
        if self.uniform_names.contains_key(name) {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': duplicate uniform name '{}'",
                self.name,
                name
            );
        }
        if self.uniforms.len() >= self.limits.max_uniform_count as usize {
            let msg = format!(
                "shader '{}': uniforms (max {})",
                self.name, self.limits.max_uniform_count
            );
            engine_error!("nebula3d::Shader", "Capacity exhausted: {}", msg);
            return Err(Error::CapacityExhausted(msg));
        }
        Ok(())
    }

    // ===== LIFECYCLE =====

    /// Finalize the layout and create GPU-side state.
    ///
    /// Computes UBO strides from the device alignment, creates the backend
    /// shader and the uniform render buffer, and allocates the global
    /// block. On any failure the shader is destroyed (state `Destroyed`)
    /// and the error propagates.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != ShaderState::Initializing {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': initialize called in state {:?}",
                self.name,
                self.state
            );
        }

        match self.initialize_inner() {
            Ok(()) => {
                self.state = ShaderState::Initialized;
                engine_debug!(
                    "nebula3d::Shader",
                    "Shader '{}' initialized ({} uniforms, global stride {}, instance stride {})",
                    self.name,
                    self.uniforms.len(),
                    self.global_ubo_stride,
                    self.instance_ubo_stride
                );
                Ok(())
            }
            Err(e) => {
                engine_error!(
                    "nebula3d::Shader",
                    "Shader '{}' initialization failed: {}",
                    self.name,
                    e
                );
                self.destroy();
                Err(e)
            }
        }
    }

    fn initialize_inner(&mut self) -> Result<()> {
        let alignment = self.device_limits.min_uniform_buffer_alignment;
        self.global_ubo_stride = align_up(self.global_ubo_size, alignment);
        self.instance_ubo_stride = align_up(self.instance_ubo_size, alignment);

        let backend = self.renderer.lock().unwrap().create_shader(ShaderDesc {
            name: self.name.clone(),
            global_ubo_size: self.global_ubo_size,
            instance_ubo_stride: self.instance_ubo_stride,
            push_constant_size: self.push_constant_size,
            global_texture_count: self.global_texture_count,
            instance_texture_count: self.instance_texture_count,
        })?;
        self.backend = Some(backend);

        if self.global_ubo_stride + self.instance_ubo_stride > 0 {
            let initial_size = self.global_ubo_stride
                + self.instance_ubo_stride * INITIAL_INSTANCE_CAPACITY as u64;
            let mut buffer = RenderBuffer::new(
                self.renderer.clone(),
                RenderBufferType::Uniform,
                initial_size,
                true,
            )?;
            if self.global_ubo_stride > 0 {
                self.global_alloc = Some(buffer.allocate(self.global_ubo_stride)?);
            }
            self.uniform_buffer = Some(buffer);
        }

        self.global_texture_maps = vec![None; self.global_texture_count as usize];
        self.instances = Vec::new();
        self.instances.resize_with(INITIAL_INSTANCE_CAPACITY, || None);
        self.instance_texture_maps =
            vec![None; INITIAL_INSTANCE_CAPACITY * self.instance_texture_count as usize];

        Ok(())
    }

    /// Tear down all GPU-side state. Legal from any state; lands in
    /// `Destroyed`.
    pub fn destroy(&mut self) {
        self.state = ShaderState::Destroying;
        self.instances.clear();
        self.instance_count = 0;
        self.instance_texture_maps.clear();
        self.global_texture_maps.clear();
        self.global_alloc = None;
        self.uniform_buffer = None;
        self.backend = None;
        self.bound_instance = None;
        self.state = ShaderState::Destroyed;
    }

    // ===== BINDING PROTOCOL =====

    /// Activate the shader's pipeline
    pub fn bind(&self) -> Result<()> {
        self.check_initialized("bind")?;
        self.backend().bind()
    }

    /// Select the Global scope for subsequent uniform writes
    pub fn bind_globals(&mut self) -> Result<()> {
        self.check_initialized("bind_globals")?;
        self.bound_scope = ShaderScope::Global;
        Ok(())
    }

    /// Select the Instance scope for `instance_id`
    pub fn bind_instance(&mut self, instance_id: u32) -> Result<()> {
        self.check_initialized("bind_instance")?;
        if !self.instance_is_live(instance_id) {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': bind_instance({}) on an inactive instance",
                self.name,
                instance_id
            );
        }
        self.bound_scope = ShaderScope::Instance;
        self.bound_instance = Some(instance_id);
        Ok(())
    }

    /// Write a value uniform.
    ///
    /// Local-scope uniforms are pushed to the backend immediately;
    /// Global/Instance writes land in the shader's uniform buffer. If the
    /// currently bound scope does not match the uniform's scope, the
    /// shader auto-rebinds so interleaved mixed-scope sets work without
    /// manual resequencing.
    pub fn set_uniform(&mut self, uniform_id: u16, value: &UniformValue) -> Result<()> {
        self.check_initialized("set_uniform")?;
        let uniform = self
            .uniforms
            .get(uniform_id as usize)
            .ok_or_else(|| {
                engine_err!(
                    "nebula3d::Shader",
                    "Shader '{}': unknown uniform id {}",
                    self.name,
                    uniform_id
                )
            })?
            .clone();

        if uniform.utype.is_sampler() {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': '{}' is a sampler, use set_sampler",
                self.name,
                uniform.name
            );
        }

        let bytes = value.as_bytes();
        if bytes.len() as u64 != uniform.size {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': value for '{}' is {} bytes, expected {}",
                self.name,
                uniform.name,
                bytes.len(),
                uniform.size
            );
        }

        match uniform.scope {
            ShaderScope::Local => {
                // Push constants bypass the UBO entirely.
                self.backend().push_constants(uniform.offset as u32, bytes)
            }
            ShaderScope::Global => {
                if self.bound_scope != ShaderScope::Global {
                    self.bind_globals()?;
                }
                let base = self.global_alloc.as_ref().ok_or(Error::NoFreelist)?.offset;
                self.uniform_buffer
                    .as_ref()
                    .ok_or(Error::NoFreelist)?
                    .load_range(base + uniform.offset, bytes)
            }
            ShaderScope::Instance => {
                let instance_id = self.bound_instance.ok_or_else(|| {
                    engine_err!(
                        "nebula3d::Shader",
                        "Shader '{}': instance uniform '{}' set with no instance bound",
                        self.name,
                        uniform.name
                    )
                })?;
                if self.bound_scope != ShaderScope::Instance {
                    self.bind_instance(instance_id)?;
                }
                let base = self
                    .instance_alloc(instance_id)?
                    .ok_or_else(|| {
                        engine_err!(
                            "nebula3d::Shader",
                            "Shader '{}': instance {} has no uniform storage",
                            self.name,
                            instance_id
                        )
                    })?
                    .offset;
                self.uniform_buffer
                    .as_ref()
                    .ok_or(Error::NoFreelist)?
                    .load_range(base + uniform.offset, bytes)
            }
        }
    }

    /// Write a value uniform, looked up by name
    pub fn set_uniform_by_name(&mut self, name: &str, value: &UniformValue) -> Result<()> {
        let id = self.uniform_id(name).ok_or_else(|| {
            engine_err!(
                "nebula3d::Shader",
                "Shader '{}': unknown uniform '{}'",
                self.name,
                name
            )
        })?;
        self.set_uniform(id, value)
    }

    /// Bind a texture to a sampler uniform.
    ///
    /// Global samplers bind immediately; instance samplers bind for the
    /// currently bound instance.
    pub fn set_sampler(
        &mut self,
        uniform_id: u16,
        texture: &Arc<dyn renderer::Texture>,
    ) -> Result<()> {
        self.check_initialized("set_sampler")?;
        let uniform = self
            .uniforms
            .get(uniform_id as usize)
            .ok_or_else(|| {
                engine_err!(
                    "nebula3d::Shader",
                    "Shader '{}': unknown uniform id {}",
                    self.name,
                    uniform_id
                )
            })?
            .clone();

        if !uniform.utype.is_sampler() {
            engine_bail!(
                "nebula3d::Shader",
                "Shader '{}': '{}' is not a sampler",
                self.name,
                uniform.name
            );
        }

        match uniform.scope {
            ShaderScope::Global => {
                self.global_texture_maps[uniform.location as usize] = Some(texture.clone());
                self.backend().bind_global_texture(uniform.location, texture)
            }
            ShaderScope::Instance => {
                let instance_id = self.bound_instance.ok_or_else(|| {
                    engine_err!(
                        "nebula3d::Shader",
                        "Shader '{}': instance sampler '{}' set with no instance bound",
                        self.name,
                        uniform.name
                    )
                })?;
                if !self.instance_is_live(instance_id) {
                    engine_bail!(
                        "nebula3d::Shader",
                        "Shader '{}': bound instance {} is not live",
                        self.name,
                        instance_id
                    );
                }
                let slot = instance_id as usize * self.instance_texture_count as usize
                    + uniform.location as usize;
                self.instance_texture_maps[slot] = Some(texture.clone());
                self.backend()
                    .bind_instance_texture(instance_id, uniform.location, texture)
            }
            ShaderScope::Local => unreachable!("Local samplers are rejected at add time"),
        }
    }

    /// Bind a sampler texture, looked up by name
    pub fn set_sampler_by_name(
        &mut self,
        name: &str,
        texture: &Arc<dyn renderer::Texture>,
    ) -> Result<()> {
        let id = self.uniform_id(name).ok_or_else(|| {
            engine_err!(
                "nebula3d::Shader",
                "Shader '{}': unknown uniform '{}'",
                self.name,
                name
            )
        })?;
        self.set_sampler(id, texture)
    }

    /// Flush global uniform state to the backend.
    ///
    /// Idempotent within one frame number: repeated calls with the same
    /// `frame_number` perform the backend flush exactly once.
    pub fn apply_globals(&mut self, frame_number: u64) -> Result<()> {
        self.check_initialized("apply_globals")?;
        if self.global_last_update_frame == Some(frame_number) {
            return Ok(());
        }
        if let Some(alloc) = self.global_alloc {
            self.backend().apply_globals(UniformRange {
                offset: alloc.offset,
                size: self.global_ubo_stride,
            })?;
        }
        self.global_last_update_frame = Some(frame_number);
        Ok(())
    }

    /// Flush the bound instance's uniform state to the backend.
    ///
    /// Idempotent per instance within one frame number.
    pub fn apply_instance(&mut self, frame_number: u64) -> Result<()> {
        self.check_initialized("apply_instance")?;
        let instance_id = self.bound_instance.ok_or_else(|| {
            engine_err!(
                "nebula3d::Shader",
                "Shader '{}': apply_instance with no instance bound",
                self.name
            )
        })?;

        let alloc = {
            let instance = self.instance_mut(instance_id)?;
            if instance.last_update_frame == Some(frame_number) {
                return Ok(());
            }
            instance.alloc
        };

        if let Some(alloc) = alloc {
            let range = UniformRange {
                offset: alloc.offset,
                size: self.instance_ubo_stride,
            };
            self.backend().apply_instance(instance_id, range)?;
        }
        self.instance_mut(instance_id)?.last_update_frame = Some(frame_number);
        Ok(())
    }

    // ===== INSTANCE MANAGEMENT =====

    /// Acquire a per-object instance slot.
    ///
    /// Finds or grows a free slot (capacity doubles when exhausted,
    /// mirrored by the instance texture-map array), allocates the
    /// instance's UBO region, and creates backend-side instance state. On
    /// backend failure the UBO allocation is rolled back and the error
    /// propagates.
    pub fn acquire_instance(&mut self) -> Result<u32> {
        self.check_initialized("acquire_instance")?;

        let slot = match self.instances.iter().position(|i| i.is_none()) {
            Some(slot) => slot,
            None => {
                let old_capacity = self.instances.len().max(1);
                let new_capacity = old_capacity * 2;
                self.instances.resize_with(new_capacity, || None);
                self.instance_texture_maps
                    .resize(new_capacity * self.instance_texture_count as usize, None);
                engine_debug!(
                    "nebula3d::Shader",
                    "Shader '{}': instance capacity grown {} -> {}",
                    self.name,
                    old_capacity,
                    new_capacity
                );
                old_capacity
            }
        };

        let alloc = if self.instance_ubo_stride > 0 {
            Some(self.allocate_instance_ubo()?)
        } else {
            None
        };

        if let Err(e) = self.backend().acquire_instance_resources(slot as u32) {
            // Roll back the UBO allocation; the slot stays free.
            if let (Some(alloc), Some(buffer)) = (alloc, self.uniform_buffer.as_mut()) {
                buffer.free(&alloc).ok();
            }
            engine_error!(
                "nebula3d::Shader",
                "Shader '{}': instance resource acquisition failed: {}",
                self.name,
                e
            );
            return Err(e);
        }

        self.instances[slot] = Some(ShaderInstance {
            alloc,
            last_update_frame: None,
        });
        self.instance_count += 1;
        Ok(slot as u32)
    }

    /// Allocate one instance stride from the uniform buffer, growing the
    /// buffer by doubling when it is full.
    fn allocate_instance_ubo(&mut self) -> Result<AllocationRef> {
        let stride = self.instance_ubo_stride;
        let buffer = self.uniform_buffer.as_mut().ok_or(Error::NoFreelist)?;
        match buffer.allocate(stride) {
            Ok(alloc) => Ok(alloc),
            Err(Error::OutOfSpace) | Err(Error::OutOfNodes) => {
                let new_size = (buffer.size() * 2).max(buffer.size() + stride);
                buffer.resize(new_size)?;
                buffer.allocate(stride)
            }
            Err(e) => Err(e),
        }
    }

    /// Release an instance slot for reuse.
    ///
    /// Frees the UBO region and clears the slot's texture maps; the
    /// instances array never shrinks.
    pub fn release_instance(&mut self, instance_id: u32) -> Result<()> {
        self.check_initialized("release_instance")?;
        let slot = instance_id as usize;
        let instance = match self.instances.get_mut(slot).and_then(|i| i.take()) {
            Some(i) => i,
            None => {
                engine_bail!(
                    "nebula3d::Shader",
                    "Shader '{}': release_instance({}) on an inactive instance",
                    self.name,
                    instance_id
                );
            }
        };

        self.backend().release_instance_resources(instance_id)?;

        if let (Some(alloc), Some(buffer)) = (instance.alloc, self.uniform_buffer.as_mut()) {
            buffer.free(&alloc)?;
        }

        let itc = self.instance_texture_count as usize;
        for map in self
            .instance_texture_maps
            .iter_mut()
            .skip(slot * itc)
            .take(itc)
        {
            *map = None;
        }

        if self.bound_instance == Some(instance_id) {
            self.bound_instance = None;
        }
        self.instance_count -= 1;
        Ok(())
    }

    // ===== INTERNAL HELPERS =====

    fn backend(&self) -> &Arc<dyn renderer::Shader> {
        // Invariant: Some while state is Initialized
        self.backend.as_ref().expect("backend shader present")
    }

    fn check_initialized(&self, op: &str) -> Result<()> {
        if self.state != ShaderState::Initialized {
            engine_warn!(
                "nebula3d::Shader",
                "Shader '{}': {} called in state {:?}",
                self.name,
                op,
                self.state
            );
            return Err(Error::InvalidOperation(format!(
                "shader '{}': {} requires Initialized state",
                self.name, op
            )));
        }
        Ok(())
    }

    fn instance_is_live(&self, instance_id: u32) -> bool {
        self.instances
            .get(instance_id as usize)
            .map(|i| i.is_some())
            .unwrap_or(false)
    }

    fn instance_mut(&mut self, instance_id: u32) -> Result<&mut ShaderInstance> {
        let name = self.name.clone();
        self.instances
            .get_mut(instance_id as usize)
            .and_then(|i| i.as_mut())
            .ok_or_else(|| {
                engine_err!(
                    "nebula3d::Shader",
                    "Shader '{}': instance {} is not live",
                    name,
                    instance_id
                )
            })
    }

    fn instance_alloc(&self, instance_id: u32) -> Result<Option<AllocationRef>> {
        self.instances
            .get(instance_id as usize)
            .and_then(|i| i.as_ref())
            .map(|i| i.alloc)
            .ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "shader '{}': instance {} is not live",
                    self.name, instance_id
                ))
            })
    }

    // ===== ACCESSORS =====

    /// Shader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ShaderState {
        self.state
    }

    /// Uniform id by name
    pub fn uniform_id(&self, name: &str) -> Option<u16> {
        self.uniform_names.get(name).copied()
    }

    /// Registered uniform by id
    pub fn uniform(&self, uniform_id: u16) -> Option<&ShaderUniform> {
        self.uniforms.get(uniform_id as usize)
    }

    /// Number of registered uniforms (values + samplers)
    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Global block size padded to the device UBO alignment
    pub fn global_ubo_stride(&self) -> u64 {
        self.global_ubo_stride
    }

    /// Instance region granularity (padded)
    pub fn instance_ubo_stride(&self) -> u64 {
        self.instance_ubo_stride
    }

    /// Total push-constant bytes consumed
    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    /// (offset, size) of each Local-scope uniform's push-constant range
    pub fn push_constant_ranges(&self) -> &[(u32, u32)] {
        &self.push_constant_ranges
    }

    /// Current instance slot capacity
    pub fn instance_capacity(&self) -> usize {
        self.instances.len()
    }

    /// Number of live instances
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Currently bound scope
    pub fn bound_scope(&self) -> ShaderScope {
        self.bound_scope
    }

    /// Currently bound instance, if any
    pub fn bound_instance(&self) -> Option<u32> {
        self.bound_instance
    }

    /// The shader's uniform render buffer (None when the shader has no
    /// value uniforms)
    pub fn uniform_buffer(&self) -> Option<&RenderBuffer> {
        self.uniform_buffer.as_ref()
    }

    /// The lease holding the global uniform block
    pub fn global_allocation(&self) -> Option<&AllocationRef> {
        self.global_alloc.as_ref()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if self.state != ShaderState::Destroyed {
            self.destroy();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;

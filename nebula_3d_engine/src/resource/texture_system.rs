/// Texture registry.
///
/// Named, reference-counted handles to GPU-backed textures with
/// auto-release-on-zero semantics and a reserved default texture that is
/// exempt from accounting. Loads happen synchronously through the
/// [`TextureLoader`] or asynchronously through the job system; in the
/// async path workers only decode pixels — the decoded data comes back
/// over a channel and `update()` performs the GPU upload on the owning
/// thread.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::job::{Job, JobPriority, JobSystem, JobTypeFlags};
use crate::renderer::{self, Renderer, TextureDesc, TextureFormat, TextureUsage};
use crate::resource::{TextureData, TextureFlags, TextureLoader, TextureResource};
use crate::{engine_debug, engine_error, engine_info, engine_warn};

new_key_type! {
    /// Generational handle to a registered texture
    pub struct TextureHandle;
}

/// Reserved name resolving to the default texture
pub const DEFAULT_TEXTURE_NAME: &str = "default";

/// Default texture dimensions (checkerboard)
pub const DEFAULT_TEXTURE_SIZE: u32 = 16;

/// Texture system configuration, consumed at init
#[derive(Debug, Clone)]
pub struct TextureSystemConfig {
    /// Maximum registered textures, the default included
    pub max_texture_count: usize,
}

impl Default for TextureSystemConfig {
    fn default() -> Self {
        Self {
            max_texture_count: 1024,
        }
    }
}

struct TextureEntry {
    texture: TextureResource,
    reference_count: usize,
    auto_release: bool,
}

/// Decoded pixels traveling from a load job back to the owning thread
struct PendingUpload {
    name: String,
    result: Result<TextureData>,
}

/// Job payload for an async texture load
struct TextureLoadJob {
    name: String,
    loader: Arc<dyn TextureLoader>,
    result: Option<Result<TextureData>>,
}

/// Registry of named, refcounted textures
pub struct TextureSystem {
    config: TextureSystemConfig,
    renderer: Arc<Mutex<dyn Renderer>>,
    loader: Arc<dyn TextureLoader>,
    entries: SlotMap<TextureHandle, TextureEntry>,
    names: FxHashMap<String, TextureHandle>,
    default_handle: TextureHandle,
    upload_tx: Sender<PendingUpload>,
    upload_rx: Receiver<PendingUpload>,
}

impl TextureSystem {
    /// Create the texture system and its default checkerboard texture.
    ///
    /// Default texture creation failure is fatal to subsystem init.
    pub fn new(
        renderer: Arc<Mutex<dyn Renderer>>,
        loader: Arc<dyn TextureLoader>,
        config: TextureSystemConfig,
    ) -> Result<Self> {
        let (upload_tx, upload_rx) = unbounded();

        let default_data = default_checkerboard();
        let backend = create_backend_texture(&renderer, &default_data)?;
        let mut entries = SlotMap::with_key();
        let mut names = FxHashMap::default();

        let default_handle = entries.insert(TextureEntry {
            texture: TextureResource::new(
                DEFAULT_TEXTURE_NAME,
                1,
                TextureFlags::IS_DEFAULT,
                backend,
            ),
            reference_count: 0,
            auto_release: false,
        });
        names.insert(DEFAULT_TEXTURE_NAME.to_string(), default_handle);

        engine_info!(
            "nebula3d::TextureSystem",
            "Texture system initialized (max {} textures)",
            config.max_texture_count
        );

        Ok(Self {
            config,
            renderer,
            loader,
            entries,
            names,
            default_handle,
            upload_tx,
            upload_rx,
        })
    }

    // ===== ACQUIRE / RELEASE =====

    /// Acquire a texture by name, loading it synchronously on first use.
    ///
    /// The reserved default name always resolves to the default texture
    /// without touching the reference table. `auto_release` is fixed by
    /// the first acquirer.
    pub fn acquire(&mut self, name: &str, auto_release: bool) -> Result<TextureHandle> {
        if name == DEFAULT_TEXTURE_NAME {
            return Ok(self.default_handle);
        }
        if let Some(&handle) = self.names.get(name) {
            self.entries[handle].reference_count += 1;
            return Ok(handle);
        }

        self.check_capacity()?;

        let data = self.loader.load(name).map_err(|e| {
            engine_warn!(
                "nebula3d::TextureSystem",
                "Texture '{}' failed to load: {}",
                name,
                e
            );
            e
        })?;
        data.validate()?;
        let backend = create_backend_texture(&self.renderer, &data)?;

        let handle = self.entries.insert(TextureEntry {
            texture: TextureResource::new(name, 1, TextureFlags::empty(), backend),
            reference_count: 1,
            auto_release,
        });
        self.names.insert(name.to_string(), handle);
        engine_debug!("nebula3d::TextureSystem", "Texture '{}' loaded", name);
        Ok(handle)
    }

    /// Acquire a texture by name, loading it through the job system.
    ///
    /// On a miss the returned handle immediately refers to a placeholder
    /// sharing the default texture's pixels (generation 0); a
    /// RESOURCE_LOAD job decodes the real pixels off-thread and
    /// [`update`](Self::update) swaps them in on the owning thread.
    pub fn acquire_async(
        &mut self,
        name: &str,
        auto_release: bool,
        jobs: &mut JobSystem,
    ) -> Result<TextureHandle> {
        if name == DEFAULT_TEXTURE_NAME {
            return Ok(self.default_handle);
        }
        if let Some(&handle) = self.names.get(name) {
            self.entries[handle].reference_count += 1;
            return Ok(handle);
        }

        self.check_capacity()?;

        // Placeholder shares the default texture's backend until the real
        // pixels arrive.
        let placeholder = self.entries[self.default_handle].texture.backend().clone();
        let handle = self.entries.insert(TextureEntry {
            texture: TextureResource::new(name, 0, TextureFlags::empty(), placeholder),
            reference_count: 1,
            auto_release,
        });
        self.names.insert(name.to_string(), handle);

        let success_tx = self.upload_tx.clone();
        let failure_tx = self.upload_tx.clone();
        let job = Job::new(
            JobTypeFlags::RESOURCE_LOAD,
            JobPriority::Normal,
            TextureLoadJob {
                name: name.to_string(),
                loader: self.loader.clone(),
                result: None,
            },
            |_, payload| {
                let result = payload.loader.load(&payload.name);
                let ok = result.is_ok();
                payload.result = Some(result);
                ok
            },
            Some(Box::new(move |payload: TextureLoadJob| {
                // Runs on the owning thread inside jobs.update(); the GPU
                // upload itself happens in TextureSystem::update().
                if let Some(result) = payload.result {
                    success_tx
                        .send(PendingUpload {
                            name: payload.name,
                            result,
                        })
                        .ok();
                }
            })),
            Some(Box::new(move |payload: TextureLoadJob| {
                let result = payload
                    .result
                    .unwrap_or_else(|| Err(Error::InvalidResource(payload.name.clone())));
                failure_tx
                    .send(PendingUpload {
                        name: payload.name,
                        result,
                    })
                    .ok();
            })),
        );
        if let Err(e) = jobs.submit(job) {
            // No worker can ever run the load; undo the registration.
            self.entries.remove(handle);
            self.names.remove(name);
            return Err(e);
        }
        Ok(handle)
    }

    /// Release a named texture.
    ///
    /// When the reference count reaches zero and the texture was acquired
    /// with auto-release, the backend resource is destroyed and the slot
    /// freed. Releasing below zero logs a warning and saturates.
    pub fn release(&mut self, name: &str) {
        if name == DEFAULT_TEXTURE_NAME {
            return;
        }
        let handle = match self.names.get(name) {
            Some(&h) => h,
            None => {
                engine_warn!(
                    "nebula3d::TextureSystem",
                    "release('{}'): texture not registered",
                    name
                );
                return;
            }
        };

        let entry = &mut self.entries[handle];
        if entry.reference_count == 0 {
            engine_warn!(
                "nebula3d::TextureSystem",
                "release('{}'): reference count already zero",
                name
            );
            return;
        }
        entry.reference_count -= 1;

        if entry.reference_count == 0 && entry.auto_release {
            self.entries.remove(handle);
            self.names.remove(name);
            engine_debug!("nebula3d::TextureSystem", "Texture '{}' destroyed", name);
        }
    }

    // ===== ASYNC UPLOAD PUMP =====

    /// Apply decoded pixels delivered by load jobs.
    ///
    /// Called once per frame on the owning thread. Returns the number of
    /// uploads applied. Failed loads keep the placeholder pixels.
    pub fn update(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(pending) = self.upload_rx.try_recv() {
            let handle = match self.names.get(&pending.name) {
                Some(&h) => h,
                // Released (or never completed registration) while the job
                // was in flight; drop the data.
                None => continue,
            };

            match pending.result.and_then(|data| {
                data.validate()?;
                create_backend_texture(&self.renderer, &data)
            }) {
                Ok(backend) => {
                    let entry = &mut self.entries[handle];
                    entry.texture.replace_backend(backend);
                    applied += 1;
                    engine_debug!(
                        "nebula3d::TextureSystem",
                        "Texture '{}' uploaded (generation {})",
                        pending.name,
                        self.entries[handle].texture.generation()
                    );
                }
                Err(e) => {
                    engine_warn!(
                        "nebula3d::TextureSystem",
                        "Async load of '{}' failed, keeping placeholder: {}",
                        pending.name,
                        e
                    );
                }
            }
        }
        applied
    }

    // ===== LOOKUP =====

    /// Get a texture by handle
    pub fn get(&self, handle: TextureHandle) -> Option<&TextureResource> {
        self.entries.get(handle).map(|e| &e.texture)
    }

    /// Look up a handle by name
    pub fn handle(&self, name: &str) -> Option<TextureHandle> {
        self.names.get(name).copied()
    }

    /// The reserved default texture
    pub fn default_texture(&self) -> &TextureResource {
        &self.entries[self.default_handle].texture
    }

    /// Handle of the reserved default texture
    pub fn default_handle(&self) -> TextureHandle {
        self.default_handle
    }

    /// Current reference count of a named texture (None if unregistered)
    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.names
            .get(name)
            .map(|&h| self.entries[h].reference_count)
    }

    /// Number of registered textures, the default included
    pub fn texture_count(&self) -> usize {
        self.entries.len()
    }

    fn check_capacity(&self) -> Result<()> {
        if self.entries.len() >= self.config.max_texture_count {
            let msg = format!("texture slots (max {})", self.config.max_texture_count);
            engine_error!("nebula3d::TextureSystem", "Capacity exhausted: {}", msg);
            return Err(Error::CapacityExhausted(msg));
        }
        Ok(())
    }
}

/// Build the backend texture for decoded pixel data
fn create_backend_texture(
    renderer: &Arc<Mutex<dyn Renderer>>,
    data: &TextureData,
) -> Result<Arc<dyn renderer::Texture>> {
    let format = match data.channel_count {
        1 => TextureFormat::R8_UNORM,
        4 => TextureFormat::R8G8B8A8_UNORM,
        other => {
            return Err(Error::InvalidResource(format!(
                "unsupported channel count {}",
                other
            )));
        }
    };
    renderer.lock().unwrap().create_texture(TextureDesc {
        width: data.width,
        height: data.height,
        format,
        usage: TextureUsage::Sampled,
        array_layers: 1,
        data: Some(data.pixels.clone()),
    })
}

/// The reserved default texture: a magenta/black checkerboard
fn default_checkerboard() -> TextureData {
    let size = DEFAULT_TEXTURE_SIZE;
    let cell = 4;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let checker = ((x / cell) + (y / cell)) % 2 == 0;
            if checker {
                pixels.extend_from_slice(&[255, 0, 255, 255]);
            } else {
                pixels.extend_from_slice(&[0, 0, 0, 255]);
            }
        }
    }
    TextureData {
        width: size,
        height: size,
        channel_count: 4,
        pixels,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_system_tests.rs"]
mod tests;

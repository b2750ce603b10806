//! Textured plane pipeline for the gallery.
//!
//! One [`Material`] per pool slot is created up front; every frame only
//! rewrites its uniform buffer. Planes are drawn back to front with alpha
//! blending and no depth buffer.

use anyhow::{Result, ensure};
use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

use super::camera::{Camera, CameraUniform};
use crate::events::PreparedTexture;
use crate::gallery::layout::{contain_scale, plane_scale};
use crate::gallery::textures::TextureCache;
use crate::gallery::{FrameSnapshot, SlotFrame};

/// Grid resolution of each plane so the cloth warp has vertices to bend.
pub const PLANE_SEGMENTS: u32 = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PlaneUniforms {
    translate: [f32; 4],
    scale: [f32; 4],
    params: [f32; 4],
}

/// Unit quad centred on the origin, split into `segments` x `segments` cells.
#[allow(clippy::cast_precision_loss)]
pub fn build_plane_mesh(segments: u32) -> (Vec<Vertex>, Vec<u32>) {
    let segments = segments.max(1);
    let row = segments + 1;
    let mut vertices = Vec::with_capacity((row * row) as usize);
    for iy in 0..row {
        for ix in 0..row {
            let x = ix as f32 / segments as f32 - 0.5;
            let y = 0.5 - iy as f32 / segments as f32;
            vertices.push(Vertex {
                position: [x, y, 0.0],
                uv: [x + 0.5, 0.5 - y],
            });
        }
    }

    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for iy in 0..segments {
        for ix in 0..segments {
            let a = iy * row + ix;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    (vertices, indices)
}

/// How a plane is sized from its texture's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneFit {
    /// Short edge fixed, long edge follows the aspect ratio.
    ShortEdge(f32),
    /// Whole image inside a square of this edge.
    Contain(f32),
}

impl PlaneFit {
    pub fn scale(self, width: u32, height: u32) -> [f32; 2] {
        match self {
            Self::ShortEdge(base) => plane_scale(width, height, base),
            Self::Contain(extent) => contain_scale(width, height, extent),
        }
    }
}

/// Indices into `slots` worth drawing, ordered far to near.
pub fn draw_order(slots: &[SlotFrame], has_texture: impl Fn(&SlotFrame) -> bool, out: &mut Vec<usize>) {
    out.clear();
    out.extend(
        slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.opacity > 0.0 && has_texture(slot))
            .map(|(idx, _)| idx),
    );
    out.sort_by(|&a, &b| slots[a].position[2].total_cmp(&slots[b].position[2]));
}

/// An uploaded image and the bind group that samples it.
pub struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

struct Material {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Per-slot uniform storage, indexed by slot.
struct MaterialPool {
    materials: Vec<Material>,
}

impl MaterialPool {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, slots: usize) -> Self {
        let materials = (0..slots)
            .map(|slot| Self::material(device, layout, slot))
            .collect();
        Self { materials }
    }

    fn material(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, slot: usize) -> Material {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gallery-plane-uniforms"),
            size: std::mem::size_of::<PlaneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gallery-plane-bind"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        debug!(slot, "allocated plane material");
        Material { buffer, bind_group }
    }

    /// Grows the pool to at least `slots` materials; never shrinks.
    fn reserve(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, slots: usize) {
        while self.materials.len() < slots {
            self.materials.push(Self::material(device, layout, self.materials.len()));
        }
    }

    fn get(&self, slot: usize) -> Option<&Material> {
        self.materials.get(slot)
    }
}

pub struct PlaneRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buf: wgpu::Buffer,
    camera_bind: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    plane_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
    index_count: u32,
    materials: MaterialPool,
    order: Vec<usize>,
}

impl PlaneRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        visible_count: usize,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gallery-shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/gallery.wgsl"
            ))),
        });

        let camera_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gallery-camera"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gallery-camera-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let camera_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gallery-camera-bind"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gallery-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let plane_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gallery-plane-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("gallery-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gallery-pipeline-layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout, &plane_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gallery-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let (vertices, indices) = build_plane_mesh(PLANE_SEGMENTS);
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gallery-plane-vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gallery-plane-indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        #[allow(clippy::cast_possible_truncation)]
        let index_count = indices.len() as u32;

        Self {
            pipeline,
            camera_buf,
            camera_bind,
            texture_layout,
            sampler,
            vertex_buf,
            index_buf,
            index_count,
            materials: MaterialPool::new(device, &plane_layout, visible_count),
            plane_layout,
            order: Vec::with_capacity(visible_count),
        }
    }

    pub fn set_camera(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&camera.uniform()));
    }

    /// Makes sure `planes` slots can be drawn in one pass.
    pub fn reserve_planes(&mut self, device: &wgpu::Device, planes: usize) {
        self.materials.reserve(device, &self.plane_layout, planes);
    }

    /// Creates a GPU texture for decoded RGBA8 pixels.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        prepared: &PreparedTexture,
    ) -> Result<GpuTexture> {
        let (w, h) = (prepared.width, prepared.height);
        ensure!(w > 0 && h > 0, "texture {} has no pixels", prepared.uri);
        ensure!(
            prepared.pixels.len() == (w as usize) * (h as usize) * 4,
            "texture {} has {} bytes, expected {}x{} RGBA",
            prepared.uri,
            prepared.pixels.len(),
            w,
            h
        );
        let limit = device.limits().max_texture_dimension_2d;
        ensure!(
            w <= limit && h <= limit,
            "texture {} ({}x{}) exceeds device limit {}",
            prepared.uri,
            w,
            h,
            limit
        );

        let size = wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("gallery-photo"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            texture.as_image_copy(),
            &prepared.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gallery-photo-bind"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        Ok(GpuTexture {
            _texture: texture,
            bind_group,
            width: w,
            height: h,
        })
    }

    /// Records the gallery pass. Slots without a loaded texture or with zero
    /// opacity are skipped.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        queue: &wgpu::Queue,
        frame: &FrameSnapshot,
        textures: &TextureCache<GpuTexture>,
        fit: PlaneFit,
        clear: wgpu::Color,
    ) {
        draw_order(
            &frame.slots,
            |slot| textures.get(slot.catalog_index).is_some(),
            &mut self.order,
        );

        for &idx in &self.order {
            let slot = &frame.slots[idx];
            let (Some(material), Some(texture)) = (
                self.materials.get(slot.slot_index),
                textures.get(slot.catalog_index),
            ) else {
                continue;
            };
            let [sx, sy] = fit.scale(texture.width, texture.height);
            let uniforms = PlaneUniforms {
                translate: [slot.position[0], slot.position[1], slot.position[2], 0.0],
                scale: [sx, sy, 1.0, 0.0],
                params: [slot.opacity, slot.blur, frame.velocity, frame.time],
            };
            queue.write_buffer(&material.buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gallery-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        if self.order.is_empty() {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.camera_bind, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        for &idx in &self.order {
            let slot = &frame.slots[idx];
            let (Some(material), Some(texture)) = (
                self.materials.get(slot.slot_index),
                textures.get(slot.catalog_index),
            ) else {
                continue;
            };
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            rpass.set_bind_group(2, &material.bind_group, &[]);
            rpass.draw_indexed(0..self.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(slot_index: usize, z: f32, opacity: f32) -> SlotFrame {
        SlotFrame {
            slot_index,
            catalog_index: slot_index,
            position: [0.0, 0.0, z],
            opacity,
            blur: 0.0,
        }
    }

    #[test]
    fn plane_mesh_covers_unit_quad() {
        let (vertices, indices) = build_plane_mesh(PLANE_SEGMENTS);
        assert_eq!(vertices.len(), 33 * 33);
        assert_eq!(indices.len(), 32 * 32 * 6);
        assert_eq!(vertices[0].position, [-0.5, 0.5, 0.0]);
        assert_eq!(vertices[0].uv, [0.0, 0.0]);
        let last = vertices[vertices.len() - 1];
        assert_eq!(last.position, [0.5, -0.5, 0.0]);
        assert_eq!(last.uv, [1.0, 1.0]);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn uniforms_are_three_vec4s() {
        assert_eq!(std::mem::size_of::<PlaneUniforms>(), 48);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }

    #[test]
    fn plane_fit_picks_the_sizing_rule() {
        assert_eq!(PlaneFit::ShortEdge(2.0).scale(400, 200), [4.0, 2.0]);
        assert_eq!(PlaneFit::Contain(2.0).scale(400, 200), [2.0, 1.0]);
    }

    #[test]
    fn draw_order_is_far_to_near_and_skips_hidden() {
        let slots = vec![
            slot(0, -5.0, 1.0),
            slot(1, -20.0, 0.5),
            slot(2, -10.0, 0.0),
            slot(3, -15.0, 1.0),
            slot(4, -1.0, 1.0),
        ];
        let mut order = Vec::new();
        draw_order(&slots, |s| s.catalog_index != 4, &mut order);
        assert_eq!(order, vec![1, 3, 0]);
    }
}

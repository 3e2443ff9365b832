use bytemuck::{Pod, Zeroable};

use crate::device::{Gpu, GpuFrame, DEPTH_FORMAT};
use crate::paint::Color;

use super::pass::{check_vertex_count, AMBIENT, LIGHT_DIR};
use super::{DrawPass, DrawTransform, RenderError, ShaderKind, Topology, Vertex};

const UNIFORM_SIZE: wgpu::BufferSize = match wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64) {
    Some(size) => size,
    None => panic!("DrawUniform must not be zero-sized"),
};

/// Per-draw uniform, addressed with a dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniform {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light: [f32; 4],
    flags: [u32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4, // color
        2 => Float32x3  // normal
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum PipelineKind {
    Triangles,
    /// Back faces culled; `mirrored` flips the front-face winding.
    LitTriangles { mirrored: bool },
    Lines,
}

#[derive(Debug, Copy, Clone)]
struct Batch {
    kind: PipelineKind,
    uniform_offset: u32,
    first_vertex: u32,
    vertex_count: u32,
}

struct Pipelines {
    triangles: wgpu::RenderPipeline,
    lit_ccw: wgpu::RenderPipeline,
    lit_cw: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, kind: PipelineKind) -> &wgpu::RenderPipeline {
        match kind {
            PipelineKind::Triangles => &self.triangles,
            PipelineKind::LitTriangles { mirrored: false } => &self.lit_ccw,
            PipelineKind::LitTriangles { mirrored: true } => &self.lit_cw,
            PipelineKind::Lines => &self.lines,
        }
    }
}

/// GPU renderer for drawable vertex runs.
///
/// Draws are staged on the CPU while the scene is traversed, then uploaded
/// and recorded into one render pass by [`flush`](Self::flush).
pub struct MeshRenderer {
    pipelines: Pipelines,
    bind_group_layout: wgpu::BindGroupLayout,

    uniform_ubo: Option<wgpu::Buffer>,
    uniform_capacity: usize,
    uniform_stride: usize,
    bind_group: Option<wgpu::BindGroup>,

    vertex_vbo: Option<wgpu::Buffer>,
    vertex_capacity: usize,

    staged_vertices: Vec<Vertex>,
    staged_uniforms: Vec<u8>,
    batches: Vec<Batch>,
    clear: Color,
}

impl MeshRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel mesh shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("easel mesh bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("easel mesh pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let build = |label, topology, cull_mode, front_face| {
            build_pipeline(device, &layout, &shader, format, label, topology, cull_mode, front_face)
        };

        let pipelines = Pipelines {
            triangles: build("easel triangles", wgpu::PrimitiveTopology::TriangleList, None, wgpu::FrontFace::Ccw),
            lit_ccw: build(
                "easel lit triangles",
                wgpu::PrimitiveTopology::TriangleList,
                Some(wgpu::Face::Back),
                wgpu::FrontFace::Ccw,
            ),
            lit_cw: build(
                "easel lit triangles (mirrored)",
                wgpu::PrimitiveTopology::TriangleList,
                Some(wgpu::Face::Back),
                wgpu::FrontFace::Cw,
            ),
            lines: build("easel lines", wgpu::PrimitiveTopology::LineList, None, wgpu::FrontFace::Ccw),
        };

        let align = device.limits().min_uniform_buffer_offset_alignment as usize;
        let uniform_stride = std::mem::size_of::<DrawUniform>().next_multiple_of(align.max(1));

        Self {
            pipelines,
            bind_group_layout,
            uniform_ubo: None,
            uniform_capacity: 0,
            uniform_stride,
            bind_group: None,
            vertex_vbo: None,
            vertex_capacity: 0,
            staged_vertices: Vec::new(),
            staged_uniforms: Vec::new(),
            batches: Vec::new(),
            clear: Color::BLACK,
        }
    }

    /// Starts staging a frame that will be cleared to `clear`.
    pub fn begin(&mut self, clear: Color) {
        self.clear = clear;
        self.staged_vertices.clear();
        self.staged_uniforms.clear();
        self.batches.clear();
    }

    /// Number of draws staged since [`begin`](Self::begin).
    pub fn staged_draws(&self) -> usize {
        self.batches.len()
    }

    /// Uploads staged draws and records the frame's render pass.
    pub fn flush(&mut self, gpu: &Gpu, frame: &mut GpuFrame) {
        let device = gpu.device();
        let queue = gpu.queue();

        if !self.batches.is_empty() {
            self.ensure_uniform_capacity(device, self.batches.len());
            self.ensure_vertex_capacity(device, self.staged_vertices.len());

            if let Some(ubo) = self.uniform_ubo.as_ref() {
                queue.write_buffer(ubo, 0, &self.staged_uniforms);
            }
            if let Some(vbo) = self.vertex_vbo.as_ref() {
                queue.write_buffer(vbo, 0, bytemuck::cast_slice(&self.staged_vertices));
            }
        }

        let c = self.clear;
        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("easel mesh pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: c.r as f64,
                        g: c.g as f64,
                        b: c.b as f64,
                        a: c.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: gpu.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let (Some(bind_group), Some(vbo)) = (self.bind_group.as_ref(), self.vertex_vbo.as_ref()) else {
            return;
        };
        if self.batches.is_empty() {
            return;
        }

        rpass.set_vertex_buffer(0, vbo.slice(..));

        let mut current: Option<PipelineKind> = None;
        for batch in &self.batches {
            if current != Some(batch.kind) {
                rpass.set_pipeline(self.pipelines.get(batch.kind));
                current = Some(batch.kind);
            }
            rpass.set_bind_group(0, bind_group, &[batch.uniform_offset]);
            rpass.draw(batch.first_vertex..batch.first_vertex + batch.vertex_count, 0..1);
        }
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_uniform_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.uniform_capacity && self.uniform_ubo.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("easel mesh uniforms"),
            size: (new_cap * self.uniform_stride) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // The bind group references the buffer, so it is rebuilt alongside it.
        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("easel mesh bind group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: Some(UNIFORM_SIZE),
                }),
            }],
        }));

        self.uniform_ubo = Some(ubo);
        self.uniform_capacity = new_cap;
    }

    fn ensure_vertex_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.vertex_capacity && self.vertex_vbo.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(1024);
        self.vertex_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("easel mesh vbo"),
            size: (new_cap * std::mem::size_of::<Vertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }
}

impl DrawPass for MeshRenderer {
    fn draw(
        &mut self,
        topology: Topology,
        shader: ShaderKind,
        transform: &DrawTransform,
        vertices: &[Vertex],
    ) -> Result<(), RenderError> {
        check_vertex_count(topology, vertices.len())?;
        if vertices.is_empty() {
            return Ok(());
        }

        let first_vertex = u32::try_from(self.staged_vertices.len())
            .map_err(|_| RenderError::Backend("vertex staging overflow".into()))?;
        let uniform_offset = u32::try_from(self.staged_uniforms.len())
            .map_err(|_| RenderError::Backend("uniform staging overflow".into()))?;

        let lit = shader == ShaderKind::Lit;
        let kind = match topology {
            Topology::LineList => PipelineKind::Lines,
            Topology::TriangleList if lit => PipelineKind::LitTriangles {
                mirrored: transform.mvp.determinant() > 0.0,
            },
            Topology::TriangleList => PipelineKind::Triangles,
        };

        let [lx, ly, lz] = LIGHT_DIR;
        let uniform = DrawUniform {
            mvp: transform.mvp.to_cols_array_2d(),
            model: transform.model.to_cols_array_2d(),
            light: [lx, ly, lz, AMBIENT],
            flags: [lit as u32, 0, 0, 0],
        };
        self.staged_uniforms.extend_from_slice(bytemuck::bytes_of(&uniform));
        self.staged_uniforms.resize(uniform_offset as usize + self.uniform_stride, 0);

        self.staged_vertices.extend_from_slice(vertices);
        self.batches.push(Batch {
            kind,
            uniform_offset,
            first_vertex,
            vertex_count: vertices.len() as u32,
        });
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    front_face: wgpu::FrontFace,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

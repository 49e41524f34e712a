//! GPU buffer abstractions
//!
//! Provides typed wrappers for vertex, index, and uniform buffers.

use crate::context::WgpuContext;
use bytemuck::{Pod, Zeroable};
use std::marker::PhantomData;

/// A GPU buffer containing vertex data.
pub struct VertexBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) count: u32,
}

impl VertexBuffer {
    /// Create a new vertex buffer from a slice of vertices.
    pub fn new<V: Pod + Zeroable>(ctx: &WgpuContext, vertices: &[V], label: Option<&str>) -> Self {
        use wgpu::util::DeviceExt;
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Self {
            buffer,
            count: vertices.len() as u32,
        }
    }

    /// Get the number of vertices.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Create a buffer slice for the entire buffer.
    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }
}

/// A GPU buffer containing u32 index data.
pub struct IndexBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) count: u32,
}

impl IndexBuffer {
    /// Create a new index buffer from u32 indices.
    pub fn new(ctx: &WgpuContext, indices: &[u32], label: Option<&str>) -> Self {
        use wgpu::util::DeviceExt;
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            buffer,
            count: indices.len() as u32,
        }
    }

    /// Get the number of indices.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Create a buffer slice for the entire buffer.
    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }
}

/// Raw uniform buffer without type information (for dynamic usage).
pub struct RawUniformBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) size: u64,
}

impl RawUniformBuffer {
    /// Create a new raw uniform buffer with specified size.
    pub fn new(ctx: &WgpuContext, size: u64, label: Option<&str>) -> Self {
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { buffer, size }
    }

    /// Create a buffer sized for `T`.
    pub fn for_type<T: Pod>(ctx: &WgpuContext, label: Option<&str>) -> Self {
        Self::new(ctx, std::mem::size_of::<T>() as u64, label)
    }

    /// Write data to the buffer.
    pub fn write<T: Pod>(&self, ctx: &WgpuContext, data: &T) {
        ctx.queue
            .write_buffer(&self.buffer, 0, bytemuck::bytes_of(data));
    }

    /// Get the raw wgpu buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get the buffer size.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Uniform buffer holding one `T` per draw, addressed with dynamic offsets.
///
/// Each element sits on its own `min_uniform_buffer_offset_alignment`
/// boundary. The buffer grows when more elements are written than it holds;
/// [`DynamicUniformBuffer::write_all`] reports that so callers can rebuild
/// bind groups that reference it.
pub struct DynamicUniformBuffer<T> {
    buffer: wgpu::Buffer,
    stride: u64,
    capacity: usize,
    label: Option<String>,
    _marker: PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    /// Create a buffer with room for `capacity` elements.
    pub fn new(ctx: &WgpuContext, capacity: usize, label: Option<&str>) -> Self {
        let alignment = ctx.device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = aligned_stride(std::mem::size_of::<T>() as u64, alignment);
        let capacity = capacity.max(1);
        let buffer = Self::allocate(ctx, stride, capacity, label);

        Self {
            buffer,
            stride,
            capacity,
            label: label.map(str::to_owned),
            _marker: PhantomData,
        }
    }

    fn allocate(
        ctx: &WgpuContext,
        stride: u64,
        capacity: usize,
        label: Option<&str>,
    ) -> wgpu::Buffer {
        ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload `items`, growing the buffer if needed. Returns `true` if the
    /// buffer was reallocated.
    pub fn write_all(&mut self, ctx: &WgpuContext, items: &[T]) -> bool {
        let grown = items.len() > self.capacity;
        if grown {
            self.capacity = items.len().next_power_of_two();
            self.buffer.destroy();
            self.buffer = Self::allocate(ctx, self.stride, self.capacity, self.label.as_deref());
            tracing::debug!(capacity = self.capacity, "grew dynamic uniform buffer");
        }

        if items.is_empty() {
            return grown;
        }

        let mut bytes = vec![0u8; self.stride as usize * items.len()];
        for (i, item) in items.iter().enumerate() {
            let start = i * self.stride as usize;
            let src = bytemuck::bytes_of(item);
            bytes[start..start + src.len()].copy_from_slice(src);
        }
        ctx.queue.write_buffer(&self.buffer, 0, &bytes);

        grown
    }

    /// Dynamic offset of element `index`.
    pub fn offset(&self, index: usize) -> wgpu::DynamicOffset {
        (self.stride * index as u64) as wgpu::DynamicOffset
    }

    /// Binding resource covering a single element.
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        })
    }

    /// Distance in bytes between consecutive elements.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Number of elements the buffer holds without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Round `size` up to a multiple of `alignment`.
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

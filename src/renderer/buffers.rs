use std::num::NonZeroU64;

/// Uniform buffer addressed with dynamic offsets. Each frame pushes its
/// blocks into CPU scratch, then [`UniformArena::flush`] uploads them in one
/// write, growing the GPU buffer when the frame needs more room.
pub(crate) struct UniformArena {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: u64,
    alignment: u64,
    block_size: u64,
    scratch: Vec<u8>,
    generation: u64,
}

impl UniformArena {
    pub(crate) fn new(
        device: &wgpu::Device,
        label: &'static str,
        block_size: u64,
        initial_blocks: u64,
    ) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let capacity = align_to(block_size, alignment) * initial_blocks.max(1);
        Self {
            label,
            buffer: create_buffer(device, label, capacity),
            capacity,
            alignment,
            block_size,
            scratch: Vec::with_capacity(capacity as usize),
            generation: 0,
        }
    }

    pub(crate) fn begin_frame(&mut self) {
        self.scratch.clear();
    }

    /// Appends `value` and returns its dynamic offset.
    pub(crate) fn push<T: bytemuck::Pod>(&mut self, value: &T) -> u32 {
        let offset = align_to(self.scratch.len() as u64, self.alignment);
        self.scratch.resize(offset as usize, 0);
        self.scratch.extend_from_slice(bytemuck::bytes_of(value));
        offset as u32
    }

    /// Uploads this frame's blocks. Returns `true` when the buffer was
    /// recreated and bind groups referencing it must be rebuilt.
    pub(crate) fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let required = align_to(self.scratch.len() as u64, self.alignment)
            .max(align_to(self.block_size, self.alignment));
        let grown = required > self.capacity;
        if grown {
            let new_capacity = required.max(self.capacity * 2);
            log::info!(
                "Growing {} buffer: {} -> {} bytes",
                self.label,
                self.capacity,
                new_capacity
            );
            self.buffer = create_buffer(device, self.label, new_capacity);
            self.capacity = new_capacity;
            self.generation += 1;
        }

        if !self.scratch.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.scratch);
        }
        grown
    }

    /// Binding covering a single block at a dynamic offset.
    pub(crate) fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(self.block_size),
        })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

/// Layout entry for a dynamic-offset uniform block of `block_size` bytes.
pub(crate) fn dynamic_uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    block_size: u64,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: true,
            min_binding_size: NonZeroU64::new(block_size),
        },
        count: None,
    }
}

fn create_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub(crate) fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_up_to_alignment() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(384, 256), 512);
        assert_eq!(align_to(4112, 256), 4352);
    }
}

use log::warn;

/// Inputs deciding whether presentation must wait for vertical blank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentPolicy {
    pub vsync: bool,
    pub fullscreen: bool,
    pub tearing_supported: bool,
}

impl PresentPolicy {
    pub fn new(vsync: bool, fullscreen: bool, available: &[wgpu::PresentMode]) -> Self {
        Self {
            vsync,
            fullscreen,
            tearing_supported: tearing_supported(available),
        }
    }

    pub fn vsync_necessary(&self) -> bool {
        self.vsync || !self.tearing_supported || self.fullscreen
    }

    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        choose_present_mode(self.vsync_necessary(), available)
    }
}

/// Unsynchronised presentation is possible when the surface offers a mode
/// that does not wait for vblank.
pub fn tearing_supported(available: &[wgpu::PresentMode]) -> bool {
    available
        .iter()
        .any(|mode| matches!(mode, wgpu::PresentMode::Immediate | wgpu::PresentMode::Mailbox))
}

pub fn choose_present_mode(
    vsync_necessary: bool,
    available: &[wgpu::PresentMode],
) -> wgpu::PresentMode {
    let preferred: &[wgpu::PresentMode] = if vsync_necessary {
        &[wgpu::PresentMode::Fifo]
    } else {
        &[wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
    };

    if let Some(mode) = preferred.iter().find(|mode| available.contains(*mode)) {
        return *mode;
    }

    if !vsync_necessary {
        warn!("No tearing present mode available. Falling back to FIFO.");
    }

    if available.contains(&wgpu::PresentMode::Fifo) {
        wgpu::PresentMode::Fifo
    } else {
        available
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo)
    }
}

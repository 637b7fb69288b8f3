#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn square(size: u32) -> Self {
        Self::new(0.0, 0.0, size as f32, size as f32)
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Window and render-target sizes driving the main viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    window_width: f32,
    window_height: f32,
    target_width: f32,
    target_height: f32,
}

impl ViewportState {
    pub fn new(window_width: f32, window_height: f32) -> Self {
        Self {
            window_width,
            window_height,
            target_width: window_width,
            target_height: window_height,
        }
    }

    pub fn with_target(mut self, target_width: f32, target_height: f32) -> Self {
        self.target_width = target_width;
        self.target_height = target_height;
        self
    }

    /// Applies a new window/target size. Zero-sized windows (minimised) are
    /// ignored and reported with `false`.
    pub fn resize(
        &mut self,
        window_width: f32,
        window_height: f32,
        target_width: f32,
        target_height: f32,
    ) -> bool {
        if window_width <= 0.0 || window_height <= 0.0 {
            log::debug!("Ignoring resize to {window_width}x{window_height}");
            return false;
        }

        self.window_width = window_width;
        self.window_height = window_height;
        self.target_width = target_width;
        self.target_height = target_height;
        true
    }

    pub fn window_size(&self) -> (f32, f32) {
        (self.window_width, self.window_height)
    }

    pub fn target_size(&self) -> (f32, f32) {
        (self.target_width, self.target_height)
    }

    /// Window-sized viewport shifted so the target area sits centred.
    pub fn main_viewport(&self) -> Viewport {
        Viewport::new(
            -(self.window_width - self.target_width) / 2.0,
            -(self.window_height - self.target_height) / 2.0,
            self.window_width,
            self.window_height,
        )
    }

    pub fn aspect(&self) -> f32 {
        self.window_width / self.window_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox_offsets_by_half_the_difference() {
        let mut state = ViewportState::new(1280.0, 720.0);
        assert!(state.resize(1920.0, 1080.0, 1280.0, 720.0));

        let vp = state.main_viewport();
        assert_eq!((vp.x, vp.y), (-320.0, -180.0));
        assert_eq!((vp.width, vp.height), (1920.0, 1080.0));
    }

    #[test]
    fn matching_target_fills_window() {
        let state = ViewportState::new(800.0, 600.0);
        assert_eq!(state.main_viewport(), Viewport::new(0.0, 0.0, 800.0, 600.0));
        assert!((state.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut state = ViewportState::new(800.0, 600.0);
        assert!(!state.resize(0.0, 0.0, 0.0, 0.0));
        assert_eq!(state.window_size(), (800.0, 600.0));
    }
}

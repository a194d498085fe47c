#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct DecodeSettings {
    /// Length of the tail given to bones without exactly one child.
    pub stub_length: f32,
    /// Mark bones that influence no vertex, directly or through a child, as hidden.
    pub hide_unused_bones: bool,
}

impl DecodeSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub_length(&mut self, stub_length: f32) {
        self.stub_length = stub_length;
    }

    pub fn hide_unused_bones(&mut self, hide: bool) {
        self.hide_unused_bones = hide;
    }
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            stub_length: 0.05,
            hide_unused_bones: false,
        }
    }
}

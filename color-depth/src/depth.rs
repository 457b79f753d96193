/// Component width of a colour: one or two bytes per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Eight,
    Sixteen,
}

impl ColorDepth {
    /// The largest representable component value at this depth.
    #[must_use]
    pub const fn max_component(self) -> u16 {
        match self {
            Self::Eight => u8::MAX as u16,
            Self::Sixteen => u16::MAX,
        }
    }

    #[must_use]
    pub const fn bytes_per_component(self) -> u8 {
        match self {
            Self::Eight => 1,
            Self::Sixteen => 2,
        }
    }
}

/// Integer width backing an id type. Acquired ids must fit in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdWidth {
    U8,
    U16,
    U32,
    U64,
}

impl IdWidth {
    /// Largest id representable in this width.
    pub const fn max(self) -> u64 {
        match self {
            IdWidth::U8 => u8::MAX as u64,
            IdWidth::U16 => u16::MAX as u64,
            IdWidth::U32 => u32::MAX as u64,
            IdWidth::U64 => u64::MAX,
        }
    }
}

/// A declared id type: a named counter slot in the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdType {
    pub name: String,
    /// Index of the counter, `0..Config::id_types`
    pub slot: usize,
    pub width: IdWidth,
}

impl IdType {
    pub fn new(name: impl Into<String>, slot: usize, width: IdWidth) -> Self {
        Self {
            name: name.into(),
            slot,
            width,
        }
    }
}

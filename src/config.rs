/// Configuration for a [`Store`](crate::Store).
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial capacity hint for the number of entries, 0 to allocate lazily
    pub initial_capacity: usize,
    /// Number of dynamic id counters (one per declared id type)
    pub id_types: usize,
    /// Start in bulk-load mode, with persistence notifications suspended
    pub start_suspended: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            id_types: 0,
            start_suspended: false,
        }
    }
}

impl Config {
    /// Default configuration with `id_types` id counters.
    pub fn with_id_types(id_types: usize) -> Self {
        Self {
            id_types,
            ..Self::default()
        }
    }
}

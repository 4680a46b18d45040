use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A rank beyond the current number of rows was accessed.
    #[error("rank {rank} out of range for table of {len} rows")]
    IndexOutOfRange { rank: usize, len: usize },

    /// The schema could not resolve a value type for the key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Rename source does not exist.
    #[error("no such value: {0}")]
    NoSuchValue(String),

    /// Rename target already exists.
    #[error("key already exists: {0}")]
    DuplicateKey(String),

    /// The id counter would exceed the maximum of the type's integer width.
    #[error("cannot acquire id for {name}: id too big for datatype (max {max})")]
    IdExhausted { name: String, max: u64 },

    /// The id type has no counter slot in this store.
    #[error("type is not used as dynamic id: {0}")]
    UnknownIdType(String),

    /// A typed accessor was used on a value of another type.
    #[error("invalid value type requested: expected {expected}, found {found}")]
    WrongValueType {
        expected: &'static str,
        found: &'static str,
    },

    /// Malformed byte-string key.
    #[error("corrupt key: {0}")]
    Corrupt(String),

    /// A persistence hook failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

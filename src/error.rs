/// Returned by `OpenHashMap::insert` when the key is already present. The
/// map is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("Key already present in map")]
    DuplicateKey,
}

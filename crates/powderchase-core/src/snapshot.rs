use serde::Serialize;
use serde::de::DeserializeOwned;

/// Failure to encode or decode a world snapshot.
#[derive(Debug)]
pub enum SnapshotError {
    Serialize(String),
    Deserialize(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(e) => write!(f, "snapshot serialize error: {e}"),
            Self::Deserialize(e) => write!(f, "snapshot deserialize error: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Encode a snapshot as MessagePack.
pub fn encode_snapshot<T: Serialize>(state: &T) -> Result<Vec<u8>, SnapshotError> {
    rmp_serde::to_vec(state).map_err(|e| SnapshotError::Serialize(e.to_string()))
}

/// Decode a MessagePack snapshot.
pub fn decode_snapshot<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SnapshotError> {
    if bytes.is_empty() {
        return Err(SnapshotError::Deserialize("empty snapshot".to_string()));
    }
    rmp_serde::from_slice(bytes).map_err(|e| SnapshotError::Deserialize(e.to_string()))
}

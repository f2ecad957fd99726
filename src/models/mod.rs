pub mod config;
pub mod notice;
pub mod policy;

/// Embeddings are stored as little-endian `f32` BLOBs.
pub(crate) fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(vector).to_vec()
}

pub(crate) fn vector_from_blob(blob: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(blob)
}

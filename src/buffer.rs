use crate::tree::SchemaTree;

/// Per-stream serialization state: the schema tree plus the output buffer
/// and the three scratch groups a record frame is assembled from. Each
/// stream owns exactly one buffer; nothing here is shared.
#[derive(Debug, Default)]
pub struct SerializationBuffer {
    pub(crate) tree: SchemaTree,
    pub(crate) out: Vec<u8>,
    pub(crate) node_scratch: Vec<u8>,
    pub(crate) key_scratch: Vec<u8>,
    pub(crate) value_scratch: Vec<u8>,
}

impl SerializationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The serialized bytes accumulated since the last flush.
    pub fn out(&self) -> &[u8] {
        &self.out
    }

    pub fn schema_tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Empties the output buffer. The schema tree and scratch buffers
    /// persist, so subsequent records keep deduplicating against the same
    /// schema.
    pub fn flush_out(&mut self) {
        self.out.clear();
    }

    /// Clears everything, including the schema tree. The buffer is ready to
    /// start a fresh stream.
    pub fn reset_all(&mut self) {
        self.out.clear();
        self.node_scratch.clear();
        self.key_scratch.clear();
        self.value_scratch.clear();
        self.tree.reset();
    }
}

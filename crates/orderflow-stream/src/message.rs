use bytes::Bytes;

/// A message fetched from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: u64,
    pub key: Option<Bytes>,
    pub value: Bytes,
}

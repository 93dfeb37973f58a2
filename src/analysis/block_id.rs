//! Sender-side block id encoding.
//!
//! Senders put `(logical_id + 1) << 2` on the wire; the +1 keeps block 0
//! from encoding to 0. There is no checksum, so a producer-side change
//! silently corrupts decoded ids.

/// Left shift applied by the sender
pub const BLOCK_ID_SHIFT: u32 = 2;

/// Offset added before shifting
pub const BLOCK_ID_OFFSET: i64 = 1;

/// Encode a logical block id the way senders do
pub fn encode_block_id(logical_id: i64) -> i64 {
    (logical_id + BLOCK_ID_OFFSET) << BLOCK_ID_SHIFT
}

/// Recover the logical block id from a raw id: `(raw >> 2) - 1`
pub fn decode_block_id(raw_id: i64) -> i64 {
    (raw_id >> BLOCK_ID_SHIFT) - BLOCK_ID_OFFSET
}

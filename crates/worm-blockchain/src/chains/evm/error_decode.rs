use alloy::{hex, primitives::Bytes, sol_types::decode_revert_reason};

/// Human-readable form of revert data: `Error(string)`/`Panic(uint)` when standard,
/// otherwise the raw custom-error selector.
pub(crate) fn decode_revert_data(data: &Bytes) -> String {
    if let Some(reason) = decode_revert_reason(data) {
        return reason;
    }

    if data.len() >= 4 {
        return format!("custom error 0x{}", hex::encode(&data[..4]));
    }

    format!("revert data 0x{}", hex::encode(data))
}

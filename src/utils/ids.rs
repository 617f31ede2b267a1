use uuid::Uuid;

pub const UPLOAD_PREFIX: &str = "IMG";
pub const ANALYSIS_PREFIX: &str = "ANA";
pub const FILE_PREFIX: &str = "FILE";
pub const CHUNK_PREFIX: &str = "CHK";
pub const REPORT_PREFIX: &str = "RPT";
pub const LINK_PREFIX: &str = "LNK";
pub const CHAT_PREFIX: &str = "CHAT";

/// Generates `<PREFIX>_<uuid v7 hex>`.
///
/// UUIDv7 carries a millisecond timestamp in its high bits followed by a
/// counter and random bits, so ids sort by creation time and collide only
/// with negligible probability across processes.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::now_v7().simple())
}

/// Twelve hex digits taken from the random tail of a fresh UUIDv7.
pub fn short_tag() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    hex[hex.len() - 12..].to_string()
}

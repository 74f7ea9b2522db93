use super::error::TrackerError;
use crate::bencode::decode;

/// Decoded reply to a byte counter report.
///
/// Every field is optional. A field that is missing, has the wrong type or
/// is out of range decodes to `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportResponse {
    /// Download rate suggested by the tracker, in bytes per second.
    pub download_speed: Option<u64>,
}

impl ReportResponse {
    /// Decodes a bencoded dictionary.
    pub fn from_bytes(body: &[u8]) -> Result<Self, TrackerError> {
        let value = decode(body)?;
        if value.as_dict().is_none() {
            return Err(TrackerError::InvalidResponse("expected dict".into()));
        }

        let download_speed = value
            .get(b"downloadSpeed")
            .and_then(|v| v.as_integer())
            .and_then(|v| u64::try_from(v).ok())
            .filter(|&v| v > 0);

        Ok(Self { download_speed })
    }

    /// Suggested download rate, or 0 when the tracker gave none.
    pub fn download_speed_or_zero(&self) -> u64 {
        self.download_speed.unwrap_or(0)
    }
}

//! DownloadedFile - ローカル API から取得したファイル本体

/// Bytes returned by the local API, paired with the display filename the
/// caller asked to save them under.
///
/// The payload is passed through untouched (no decryption or transformation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

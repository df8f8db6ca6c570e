pub type FileId = u64;

/// Byte range in a source file that an emitted instruction is attributed to.
///
/// The default span is "unknown": file 0, empty range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        debug_assert!(lo <= hi, "span {}..{} is reversed", lo, hi);
        Span { file, lo, hi }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Span::default()
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "file{}:{}..{}", self.file, self.lo, self.hi)
        }
    }
}

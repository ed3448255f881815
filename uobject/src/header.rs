use std::num::NonZeroU64;

#[derive(Debug)]
pub(crate) struct ContainerHeader {
    pub(crate) magic_bytes: [u8; 4],
    pub(crate) version: u32,
    pub(crate) trailer: Option<NonZeroU64>,
}

// Make some attempt to not accidentally load plain text files,
// and also make it break almost immediately in any UTF-8 compliant text parser.
pub(crate) const MAGIC_BYTES: &[u8; 4] = b"\xffUOB";

impl ContainerHeader {
    /// Magic bytes, version, 8 reserved bytes and the trailer pointer.
    pub(crate) const SIZE: usize = 24;

    /// Where the first section starts.
    pub(crate) const SIZE_NONZERO: NonZeroU64 = match NonZeroU64::new(Self::SIZE as u64) {
        Some(size) => size,
        None => panic!("header size must not be zero"),
    };

    pub(crate) fn new(trailer: Option<NonZeroU64>) -> ContainerHeader {
        ContainerHeader {
            magic_bytes: *MAGIC_BYTES,
            version: 0x0,
            trailer,
        }
    }
}

impl Default for ContainerHeader {
    fn default() -> Self {
        ContainerHeader::new(None)
    }
}

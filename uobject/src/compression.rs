use std::fmt;
use std::io::{Read, Result, Seek, Write};
use std::str::FromStr;

#[cfg(feature = "brotli")]
use comde::brotli::{BrotliCompressor, BrotliDecompressor};
#[cfg(feature = "deflate")]
use comde::deflate::{DeflateCompressor, DeflateDecompressor};
#[cfg(feature = "snappy")]
use comde::snappy::{SnappyCompressor, SnappyDecompressor};
#[cfg(feature = "xz")]
use comde::xz::{XzCompressor, XzDecompressor};
#[cfg(feature = "zstd")]
use comde::zstd::{ZstdCompressor, ZstdDecompressor};
use comde::{
    stored::{StoredCompressor, StoredDecompressor},
    ByteCount, Compressor, Decompressor,
};

pub mod constants {
    pub const COMPRESSION_STORED: u8 = 0x00;
    pub const COMPRESSION_DEFLATE: u8 = 0x10;
    pub const COMPRESSION_ZSTD: u8 = 0x20;
    pub const COMPRESSION_XZ: u8 = 0x30;
    pub const COMPRESSION_SNAPPY: u8 = 0x40;
    pub const COMPRESSION_BROTLI: u8 = 0x50;
}

use self::constants::*;

/// Compression applied to a section payload.
#[derive(Clone, Copy, Eq, PartialEq, Default)]
pub enum Compression {
    #[default]
    Stored,
    Deflate,
    Zstd,
    Xz,
    Snappy,
    Brotli,
    Unknown(u8),
}

impl Compression {
    pub const fn available_variants() -> &'static [&'static str] {
        &["stored", "brotli", "deflate", "snappy", "xz", "zstd"]
    }

    pub const fn id(self) -> u8 {
        use Compression::*;

        match self {
            Stored => COMPRESSION_STORED,
            Deflate => COMPRESSION_DEFLATE,
            Zstd => COMPRESSION_ZSTD,
            Xz => COMPRESSION_XZ,
            Snappy => COMPRESSION_SNAPPY,
            Brotli => COMPRESSION_BROTLI,
            Unknown(id) => id,
        }
    }

    pub const fn from_id(id: u8) -> Compression {
        use Compression::*;

        match id {
            COMPRESSION_STORED => Stored,
            COMPRESSION_DEFLATE => Deflate,
            COMPRESSION_ZSTD => Zstd,
            COMPRESSION_XZ => Xz,
            COMPRESSION_SNAPPY => Snappy,
            COMPRESSION_BROTLI => Brotli,
            id => Unknown(id),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Compression::*;

        // Same names `FromStr` accepts.
        let name = match self {
            Stored => "stored",
            Deflate => "deflate",
            Zstd => "zstd",
            Xz => "xz",
            Snappy => "snappy",
            Brotli => "brotli",
            Unknown(id) => return write!(f, "unknown({:#04x})", id),
        };

        f.write_str(name)
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown compression method: {0}")]
pub struct ParseCompressionError(String);

impl FromStr for Compression {
    type Err = ParseCompressionError;

    fn from_str(src: &str) -> std::result::Result<Self, Self::Err> {
        let compression = match src {
            "stored" => Compression::Stored,
            "brotli" => Compression::Brotli,
            "deflate" => Compression::Deflate,
            "snappy" => Compression::Snappy,
            "xz" => Compression::Xz,
            "zstd" | "zstandard" => Compression::Zstd,
            _ => return Err(ParseCompressionError(src.to_string())),
        };

        Ok(compression)
    }
}

impl Compression {
    pub fn compress<W: Write + Seek, R: Read>(
        self,
        mut writer: W,
        reader: &mut R,
    ) -> Result<ByteCount> {
        use Compression::*;

        match self {
            Stored => StoredCompressor.compress(&mut writer, reader),
            #[cfg(feature = "deflate")]
            Deflate => DeflateCompressor.compress(&mut writer, reader),
            #[cfg(feature = "zstd")]
            Zstd => ZstdCompressor.compress(&mut writer, reader),
            #[cfg(feature = "xz")]
            Xz => XzCompressor.compress(&mut writer, reader),
            #[cfg(feature = "snappy")]
            Snappy => SnappyCompressor.compress(&mut writer, reader),
            #[cfg(feature = "brotli")]
            Brotli => BrotliCompressor.compress(&mut writer, reader),
            Unknown(id) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot compress with unknown method {:#04x}", id),
            )),
            #[allow(unreachable_patterns)]
            missing => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("compression `{}` is not compiled in", missing),
            )),
        }
    }

    pub fn decompress_write<R: Read, W: Write>(self, reader: R, writer: W) -> Result<()> {
        use Compression::*;

        match self {
            Stored => StoredDecompressor.copy(reader, writer),
            #[cfg(feature = "deflate")]
            Deflate => DeflateDecompressor.copy(reader, writer),
            #[cfg(feature = "zstd")]
            Zstd => ZstdDecompressor.copy(reader, writer),
            #[cfg(feature = "xz")]
            Xz => XzDecompressor.copy(reader, writer),
            #[cfg(feature = "snappy")]
            Snappy => SnappyDecompressor.copy(reader, writer),
            #[cfg(feature = "brotli")]
            Brotli => BrotliDecompressor.copy(reader, writer),
            Unknown(id) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot decompress unknown method {:#04x}", id),
            )),
            #[allow(unreachable_patterns)]
            missing => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("compression `{}` is not compiled in", missing),
            )),
        }?;

        Ok(())
    }
}

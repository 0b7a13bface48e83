use crate::error::NormalizerError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

/// Compound File Binary signature. Encrypted OOXML packages are stored as CFB
/// containers instead of zip archives.
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A unified reader over workbook bytes, either from disk or already in memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer (uploads, tests)
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local workbook file
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<UnifiedReader, NormalizerError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps workbook bytes that are already loaded
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Checks the leading bytes for a CFB container and rewinds afterwards.
    /// Returns false for short or unreadable inputs; the zip reader reports those.
    pub(crate) fn is_cfb_container(&mut self) -> bool {
        let mut signature = [0u8; 8];
        let matched = self.read_exact(&mut signature).is_ok() && signature == CFB_SIGNATURE;
        let rewound = self.seek(SeekFrom::Start(0)).is_ok();
        matched && rewound
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

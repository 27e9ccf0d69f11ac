use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};
use std::time::SystemTime;

use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, Local, Timelike};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Invalid End of Central Directory");
        }

        // Verify signature
        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// True when the archive spans multiple disks or carries ZIP64
    /// marker values. Neither is supported by this engine.
    pub fn is_unsupported(&self) -> bool {
        self.disk_number != 0
            || self.disk_with_cd != 0
            || self.disk_entries != self.total_entries
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Version needed to extract written by this engine (2.0: deflate support)
pub const ZIP_VERSION: u16 = 20;

/// General purpose flag bit 3: sizes/CRC live in a trailing data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// General purpose flag bit 11: entry name is UTF-8
pub const FLAG_UTF8_NAME: u16 = 1 << 11;

/// Trailing data descriptor: signature + CRC + compressed + uncompressed size
pub const DATA_DESCRIPTOR_LEN: u64 = 16;

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
    pub lfh_offset: u32,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    /// True when the entry declares a trailing data descriptor
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

/// Pack a timestamp into DOS (date, time) fields.
///
/// Dates before 1980 are not representable and clamp to the earliest
/// DOS date (1980-01-01) with time zero.
pub fn dos_date_time(time: SystemTime) -> (u16, u16) {
    let local: DateTime<Local> = time.into();
    if local.year() < 1980 {
        return (0x21, 0);
    }
    let date = (((local.year() - 1980) as u16) << 9)
        | ((local.month() as u16) << 5)
        | local.day() as u16;
    let time = ((local.hour() as u16) << 11)
        | ((local.minute() as u16) << 5)
        | (local.second() as u16 >> 1);
    (date, time)
}

/// The fixed fields shared by a local file header and its central
/// directory record.
///
/// Both the builder and the aligner emit headers through this type so the
/// two records for one entry can never disagree on CRC, sizes or name.
pub struct EntryHeader<'a> {
    pub flags: u16,
    pub method: u16,
    pub dos_time: u16,
    pub dos_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: &'a [u8],
}

impl EntryHeader<'_> {
    /// Write a local file header followed by `extra`.
    ///
    /// Returns the number of bytes written.
    pub fn write_local<W: Write>(&self, mut w: W, extra: &[u8]) -> Result<usize> {
        w.write_all(LFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(ZIP_VERSION)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.method)?;
        w.write_u16::<LittleEndian>(self.dos_time)?;
        w.write_u16::<LittleEndian>(self.dos_date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name.len() as u16)?;
        w.write_u16::<LittleEndian>(extra.len() as u16)?;
        w.write_all(self.name)?;
        w.write_all(extra)?;
        Ok(LFH_SIZE + self.name.len() + extra.len())
    }

    /// Write a central directory record pointing back at `lfh_offset`.
    ///
    /// The entry comment is truncated to the 65535 bytes the field can
    /// address. Returns the number of bytes written.
    pub fn write_central<W: Write>(
        &self,
        mut w: W,
        extra: &[u8],
        comment: &[u8],
        lfh_offset: u32,
    ) -> Result<usize> {
        let comment = &comment[..comment.len().min(0xFFFF)];
        w.write_all(CDFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(ZIP_VERSION)?; // version made by
        w.write_u16::<LittleEndian>(ZIP_VERSION)?; // version needed to extract
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.method)?;
        w.write_u16::<LittleEndian>(self.dos_time)?;
        w.write_u16::<LittleEndian>(self.dos_date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name.len() as u16)?;
        w.write_u16::<LittleEndian>(extra.len() as u16)?;
        w.write_u16::<LittleEndian>(comment.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?; // starting disk number
        w.write_u16::<LittleEndian>(0)?; // internal file attributes
        w.write_u32::<LittleEndian>(0)?; // external file attributes
        w.write_u32::<LittleEndian>(lfh_offset)?;
        w.write_all(self.name)?;
        w.write_all(extra)?;
        w.write_all(comment)?;
        Ok(CDFH_MIN_SIZE + self.name.len() + extra.len() + comment.len())
    }
}

/// Write the end of central directory record (single-disk archives only).
pub fn write_eocd<W: Write>(
    mut w: W,
    entry_count: u16,
    cd_size: u32,
    cd_offset: u32,
    comment: &[u8],
) -> Result<()> {
    let comment = &comment[..comment.len().min(0xFFFF)];
    w.write_all(EndOfCentralDirectory::SIGNATURE)?;
    w.write_u16::<LittleEndian>(0)?; // number of this disk
    w.write_u16::<LittleEndian>(0)?; // disk with central directory start
    w.write_u16::<LittleEndian>(entry_count)?;
    w.write_u16::<LittleEndian>(entry_count)?;
    w.write_u32::<LittleEndian>(cd_size)?;
    w.write_u32::<LittleEndian>(cd_offset)?;
    w.write_u16::<LittleEndian>(comment.len() as u16)?;
    w.write_all(comment)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dos_round_trip() {
        // 2024-06-15 10:30:44 local time
        let time: SystemTime = Local
            .with_ymd_and_hms(2024, 6, 15, 10, 30, 44)
            .unwrap()
            .into();
        let (date, time) = dos_date_time(time);

        let entry = ZipFileEntry {
            file_name: String::new(),
            flags: 0,
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            last_mod_time: time,
            last_mod_date: date,
            extra: Vec::new(),
            comment: Vec::new(),
            is_directory: false,
        };
        assert_eq!(entry.mod_date(), (2024, 6, 15));
        assert_eq!(entry.mod_time(), (10, 30, 44));
    }

    #[test]
    fn dos_clamps_pre_1980() {
        let (date, time) = dos_date_time(SystemTime::UNIX_EPOCH);
        assert_eq!(date, 0x21);
        assert_eq!(time, 0);
    }
}

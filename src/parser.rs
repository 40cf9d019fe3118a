// Drop notifications as they come off the ring buffer:
//
//   0      1        2          4      8          12        16        20        24       28        32
//   | type | subtype | source  | hash | orig_len | cap_len | src_lbl | dst_lbl | dst_id | ifindex | payload...
//
// All multi-byte fields are little-endian.

use std::io::{self, Cursor, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::DecodeError;

/// Size of the fixed record prefix; anything after it is packet data.
pub const DROP_NOTIFY_LEN: usize = 32;

/// Monitor message types sharing the ring buffer.
pub mod message_type {
    pub const DROP: u8 = 1;
    pub const DEBUG: u8 = 2;
    pub const CAPTURE: u8 = 3;
    pub const TRACE: u8 = 4;

    pub fn name(t: u8) -> &'static str {
        match t {
            DROP => "drop",
            DEBUG => "debug",
            CAPTURE => "capture",
            TRACE => "trace",
            _ => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DropRecord {
    pub event_type: u8,
    pub sub_type: u8,
    pub source: u16,
    pub hash: u32,
    pub orig_len: u32,
    pub cap_len: u32,
    pub src_label: u32,
    pub dst_label: u32,
    pub dst_id: u32,
    pub ifindex: u32,
}

impl DropRecord {
    pub const LEN: usize = DROP_NOTIFY_LEN;

    /// Decode the record prefix of `buf`. Trailing bytes are left alone.
    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::LEN {
            return Err(DecodeError::TooShort { have: buf.len(), need: Self::LEN });
        }

        let mut rdr = Cursor::new(&buf[..Self::LEN]);
        Ok(Self {
            event_type: rdr.read_u8()?,
            sub_type: rdr.read_u8()?,
            source: rdr.read_u16::<LittleEndian>()?,
            hash: rdr.read_u32::<LittleEndian>()?,
            orig_len: rdr.read_u32::<LittleEndian>()?,
            cap_len: rdr.read_u32::<LittleEndian>()?,
            src_label: rdr.read_u32::<LittleEndian>()?,
            dst_label: rdr.read_u32::<LittleEndian>()?,
            dst_id: rdr.read_u32::<LittleEndian>()?,
            ifindex: rdr.read_u32::<LittleEndian>()?,
        })
    }

    /// Encode the record in wire order, for producers speaking the same format.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(self.event_type)?;
        w.write_u8(self.sub_type)?;
        w.write_u16::<LittleEndian>(self.source)?;
        w.write_u32::<LittleEndian>(self.hash)?;
        w.write_u32::<LittleEndian>(self.orig_len)?;
        w.write_u32::<LittleEndian>(self.cap_len)?;
        w.write_u32::<LittleEndian>(self.src_label)?;
        w.write_u32::<LittleEndian>(self.dst_label)?;
        w.write_u32::<LittleEndian>(self.dst_id)?;
        w.write_u32::<LittleEndian>(self.ifindex)
    }

    pub fn to_bytes(&self) -> [u8; DROP_NOTIFY_LEN] {
        let mut out = [0u8; DROP_NOTIFY_LEN];
        out[0] = self.event_type;
        out[1] = self.sub_type;
        LittleEndian::write_u16(&mut out[2..4], self.source);
        LittleEndian::write_u32_into(
            &[
                self.hash,
                self.orig_len,
                self.cap_len,
                self.src_label,
                self.dst_label,
                self.dst_id,
                self.ifindex,
            ],
            &mut out[4..],
        );
        out
    }

    pub fn is_drop(&self) -> bool {
        self.event_type == message_type::DROP
    }

    /// Captured packet bytes following the record, bounded by `cap_len`.
    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        if self.cap_len == 0 || buf.len() <= Self::LEN {
            return &[];
        }
        let rest = &buf[Self::LEN..];
        &rest[..rest.len().min(self.cap_len as usize)]
    }
}

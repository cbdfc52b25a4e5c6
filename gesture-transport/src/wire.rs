//! Fixed wire layout of a gesture event record
//!
//! Field order and offsets reproduce the C struct the gesture modules were
//! compiled against:
//!
//! ```text
//! offset  size  field
//!      0     4  int32    gesture
//!      4    12  float[3] vector
//!     16     1  int8     status
//!     17     3  reserved (0)
//!     20     4  alignment padding (0)
//!     24     8  int64    time (ns)
//!     32     4  uint32   reserved (0)
//!     36     4  tail padding (0)
//! ```
//!
//! Records are stored in native byte order, like the in-memory struct.

use std::io::{self, Read, Write};

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::ChannelError;
use crate::types::{GestureEvent, GestureHandle, GestureVector};

/// Size of one record on the wire
pub const RECORD_SIZE: usize = std::mem::size_of::<GestureRecord>();

/// One gesture event in its binary form.
///
/// Padding is spelled out so the layout has no implicit holes; every
/// reserved and padding byte is zero in a well-formed record.
#[derive(Debug, Clone, Copy, PartialEq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GestureRecord {
    pub gesture: i32,
    pub vector: [f32; 3],
    pub status: i8,
    reserved: [u8; 3],
    _align: [u8; 4],
    pub time: i64,
    reserved2: u32,
    _tail: [u8; 4],
}

impl GestureRecord {
    /// All-zero record, the initial value of a poll output slot
    pub fn zeroed() -> Self {
        Self {
            gesture: 0,
            vector: [0.0; 3],
            status: 0,
            reserved: [0; 3],
            _align: [0; 4],
            time: 0,
            reserved2: 0,
            _tail: [0; 4],
        }
    }

    /// Parse a record from exactly `RECORD_SIZE` bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ChannelError> {
        Self::read_from_bytes(bytes).map_err(|_| {
            ChannelError::MalformedRecord(format!(
                "expected {RECORD_SIZE} bytes, got {}",
                bytes.len()
            ))
        })
    }

    fn reserved_is_zero(&self) -> bool {
        self.reserved == [0; 3] && self._align == [0; 4] && self.reserved2 == 0 && self._tail == [0; 4]
    }
}

impl From<&GestureEvent> for GestureRecord {
    fn from(ev: &GestureEvent) -> Self {
        Self {
            gesture: ev.gesture.as_i32(),
            vector: ev.vector.v,
            status: ev.vector.status,
            reserved: [0; 3],
            _align: [0; 4],
            time: ev.timestamp_ns,
            reserved2: 0,
            _tail: [0; 4],
        }
    }
}

impl TryFrom<GestureRecord> for GestureEvent {
    type Error = ChannelError;

    fn try_from(rec: GestureRecord) -> Result<Self, Self::Error> {
        if !rec.reserved_is_zero() {
            return Err(ChannelError::MalformedRecord(
                "reserved bytes must be zero".into(),
            ));
        }
        let gesture = GestureHandle::try_from(rec.gesture)
            .map_err(|e| ChannelError::MalformedRecord(e.to_string()))?;
        Ok(GestureEvent::new(
            gesture,
            GestureVector::new(rec.vector, rec.status),
            rec.time,
        ))
    }
}

/// Append one record to a writer
pub fn write_record<W: Write>(out: &mut W, ev: &GestureEvent) -> io::Result<()> {
    out.write_all(GestureRecord::from(ev).as_bytes())
}

/// Iterator over the records of a recording
pub struct RecordReader<R> {
    inner: R,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    fn read_one(&mut self) -> Result<Option<GestureEvent>, ChannelError> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        match filled {
            0 => Ok(None),
            RECORD_SIZE => GestureRecord::from_slice(&buf)
                .and_then(GestureEvent::try_from)
                .map(Some),
            n => Err(ChannelError::MalformedRecord(format!(
                "truncated record: {n} of {RECORD_SIZE} bytes"
            ))),
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<GestureEvent, ChannelError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_one() {
            Ok(Some(ev)) => Some(Ok(ev)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

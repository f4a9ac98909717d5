//! Swarm coordination messages
//!
//! Defines the closed set of messages exchanged between the tracker and the
//! peers, together with their wire encoding.

use anyhow::Result;
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use tracing::{error, trace};

use crate::error::SwarmError;

/// Length of a segment identifier, in bytes
pub const SEGMENT_ID_LEN: usize = 32;

/// Wire value standing for the -1/-1 shutdown sentinel
const SHUTDOWN_SENTINEL: u32 = u32::MAX;

/// Identifier of a process participating in the run
///
/// Id 0 is reserved for the tracker; peers are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// The tracker's process id
    pub const TRACKER: ProcessId = ProcessId(0);

    /// Check whether this id addresses the tracker
    pub fn is_tracker(&self) -> bool {
        self.0 == 0
    }

    /// Zero-based position of a peer id in per-peer tables
    pub fn peer_offset(&self) -> usize {
        debug_assert!(!self.is_tracker());
        (self.0 - 1) as usize
    }

    /// Peer id for a zero-based table offset
    pub fn from_peer_offset(offset: usize) -> Self {
        ProcessId(offset as u32 + 1)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tracker() {
            write!(f, "tracker")
        } else {
            write!(f, "peer {}", self.0)
        }
    }
}

/// Index of a file in the swarm catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Zero-based index into catalog-ordered containers
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file #{}", self.0)
    }
}

/// Opaque fixed-length segment identifier
///
/// Stands in for real segment content; no verification is performed beyond
/// the length and ASCII checks at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentId([u8; SEGMENT_ID_LEN]);

impl SegmentId {
    /// Build a segment identifier from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SEGMENT_ID_LEN {
            return Err(SwarmError::validation_error_with_field(
                format!("Segment identifier must be {} bytes, got {}", SEGMENT_ID_LEN, bytes.len()),
                "segment_id",
            )
            .into());
        }
        if !bytes.is_ascii() {
            return Err(SwarmError::validation_error_with_field(
                "Segment identifier must be ASCII",
                "segment_id",
            )
            .into());
        }
        let mut id = [0u8; SEGMENT_ID_LEN];
        id.copy_from_slice(bytes);
        Ok(SegmentId(id))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII content.
        std::str::from_utf8(&self.0).unwrap_or("")
    }

    /// Get the raw identifier bytes
    pub fn as_bytes(&self) -> &[u8; SEGMENT_ID_LEN] {
        &self.0
    }
}

impl std::str::FromStr for SegmentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SegmentId::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-peer segment ownership for a single file
///
/// Rows are peers (zero-based offsets), columns are segments, stored as
/// bitfields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTable {
    peers: usize,
    segments: usize,
    rows: Vec<Vec<u8>>,
}

impl OwnershipTable {
    /// Create an empty table for the given dimensions
    pub fn new(peers: usize, segments: usize) -> Self {
        let row_len = (segments + 7) / 8;
        Self {
            peers,
            segments,
            rows: vec![vec![0u8; row_len]; peers],
        }
    }

    /// Number of peer rows
    pub fn peers(&self) -> usize {
        self.peers
    }

    /// Number of segment columns
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Mark a segment as owned by a peer
    pub fn set(&mut self, peer_offset: usize, segment: u32) {
        let segment = segment as usize;
        if peer_offset < self.peers && segment < self.segments {
            let byte_index = segment / 8;
            let bit_index = 7 - (segment % 8);
            self.rows[peer_offset][byte_index] |= 1 << bit_index;
        }
    }

    /// Check whether a peer owns a segment
    pub fn has(&self, peer_offset: usize, segment: u32) -> bool {
        let segment = segment as usize;
        if peer_offset >= self.peers || segment >= self.segments {
            return false;
        }
        let byte_index = segment / 8;
        let bit_index = 7 - (segment % 8);
        (self.rows[peer_offset][byte_index] >> bit_index) & 1 == 1
    }

    /// Zero-based offsets of all peers owning a segment
    pub fn holders(&self, segment: u32) -> Vec<usize> {
        (0..self.peers).filter(|p| self.has(*p, segment)).collect()
    }
}

/// Wire codes for swarm messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageCode {
    Register = 1,
    CatalogReply = 2,
    PeerListQuery = 3,
    PeerListReply = 4,
    SegmentRequest = 5,
    SegmentReply = 6,
    SegmentAcquired = 7,
    FileComplete = 8,
    AllFilesComplete = 9,
}

impl TryFrom<u8> for MessageCode {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        trace!("Converting byte to MessageCode: {}", value);
        match value {
            1 => Ok(MessageCode::Register),
            2 => Ok(MessageCode::CatalogReply),
            3 => Ok(MessageCode::PeerListQuery),
            4 => Ok(MessageCode::PeerListReply),
            5 => Ok(MessageCode::SegmentRequest),
            6 => Ok(MessageCode::SegmentReply),
            7 => Ok(MessageCode::SegmentAcquired),
            8 => Ok(MessageCode::FileComplete),
            9 => Ok(MessageCode::AllFilesComplete),
            _ => {
                error!("Invalid message code: {}", value);
                Err(SwarmError::protocol_error_with_source(
                    "Invalid message code",
                    format!("value: {}", value),
                )
                .into())
            }
        }
    }
}

/// Swarm coordination message
///
/// The closed taxonomy of everything that travels between processes. There
/// is no wire code for `Shutdown`: it rides as a `SegmentRequest` frame with
/// both indices set to the -1 sentinel, which decoding maps back.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Peer -> tracker: segment counts of the files the peer fully owns
    Register { files: Vec<(FileId, u32)> },
    /// Tracker -> peer: the finalized swarm-wide file sizes
    CatalogReply { files: Vec<(FileId, u32)> },
    /// Peer -> tracker: ask for the ownership table of a file
    PeerListQuery { file: FileId },
    /// Tracker -> peer: ownership table snapshot for a file
    PeerListReply { file: FileId, table: OwnershipTable },
    /// Peer -> peer: ask a donor for one segment identifier
    SegmentRequest { file: FileId, segment: u32 },
    /// Peer -> peer: the requested segment identifier
    SegmentReply { id: SegmentId },
    /// Peer -> tracker: the sender now owns this segment
    SegmentAcquired { file: FileId, segment: u32 },
    /// Peer -> tracker: the sender now owns every segment of this file
    FileComplete { file: FileId },
    /// Peer -> tracker: the sender has finished all its downloads
    AllFilesComplete,
    /// Tracker -> peer upload worker: stop serving requests
    Shutdown,
}

impl Message {
    /// Get the wire code this message is framed under
    pub fn code(&self) -> MessageCode {
        match self {
            Message::Register { .. } => MessageCode::Register,
            Message::CatalogReply { .. } => MessageCode::CatalogReply,
            Message::PeerListQuery { .. } => MessageCode::PeerListQuery,
            Message::PeerListReply { .. } => MessageCode::PeerListReply,
            Message::SegmentRequest { .. } => MessageCode::SegmentRequest,
            Message::SegmentReply { .. } => MessageCode::SegmentReply,
            Message::SegmentAcquired { .. } => MessageCode::SegmentAcquired,
            Message::FileComplete { .. } => MessageCode::FileComplete,
            Message::AllFilesComplete => MessageCode::AllFilesComplete,
            // Shutdown travels as a sentinel segment request.
            Message::Shutdown => MessageCode::SegmentRequest,
        }
    }

    /// Serialize the message to a wire frame
    pub fn serialize(&self) -> Vec<u8> {
        trace!("Serializing message: {:?}", self.code());
        let mut buf = BytesMut::new();
        buf.put_u8(self.code() as u8);

        match self {
            Message::Register { files } | Message::CatalogReply { files } => {
                buf.put_u32(files.len() as u32);
                for (file, size) in files {
                    buf.put_u32(file.0);
                    buf.put_u32(*size);
                }
            }
            Message::PeerListQuery { file } => {
                buf.put_u32(file.0);
            }
            Message::PeerListReply { file, table } => {
                buf.put_u32(file.0);
                buf.put_u32(table.peers as u32);
                buf.put_u32(table.segments as u32);
                for row in &table.rows {
                    buf.put_slice(row);
                }
            }
            Message::SegmentRequest { file, segment } => {
                buf.put_u32(file.0);
                buf.put_u32(*segment);
            }
            Message::SegmentReply { id } => {
                buf.put_slice(id.as_bytes());
            }
            Message::SegmentAcquired { file, segment } => {
                buf.put_u32(file.0);
                buf.put_u32(*segment);
            }
            Message::FileComplete { file } => {
                buf.put_u32(file.0);
            }
            Message::AllFilesComplete => {}
            Message::Shutdown => {
                buf.put_u32(SHUTDOWN_SENTINEL);
                buf.put_u32(SHUTDOWN_SENTINEL);
            }
        }

        trace!("Message serialized: {} bytes", buf.len());
        buf.to_vec()
    }

    /// Deserialize a message from a wire frame
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        trace!("Deserializing message from {} bytes", data.len());
        let mut buf = BytesMut::from(data);

        if buf.is_empty() {
            error!("Empty message frame");
            return Err(SwarmError::protocol_error("Empty message frame").into());
        }

        let code = MessageCode::try_from(buf.get_u8())?;

        match code {
            MessageCode::Register | MessageCode::CatalogReply => {
                if buf.remaining() < 4 {
                    return Err(frame_too_short(code, 4, buf.remaining()));
                }
                let count = buf.get_u32() as usize;
                if buf.remaining() < count * 8 {
                    return Err(frame_too_short(code, count * 8, buf.remaining()));
                }
                let mut files = Vec::with_capacity(count);
                for _ in 0..count {
                    let file = FileId(buf.get_u32());
                    let size = buf.get_u32();
                    files.push((file, size));
                }
                if code == MessageCode::Register {
                    Ok(Message::Register { files })
                } else {
                    Ok(Message::CatalogReply { files })
                }
            }
            MessageCode::PeerListQuery => {
                if buf.remaining() < 4 {
                    return Err(frame_too_short(code, 4, buf.remaining()));
                }
                Ok(Message::PeerListQuery { file: FileId(buf.get_u32()) })
            }
            MessageCode::PeerListReply => {
                if buf.remaining() < 12 {
                    return Err(frame_too_short(code, 12, buf.remaining()));
                }
                let file = FileId(buf.get_u32());
                let peers = buf.get_u32() as usize;
                let segments = buf.get_u32() as usize;
                let row_len = (segments + 7) / 8;
                if buf.remaining() < peers * row_len {
                    return Err(frame_too_short(code, peers * row_len, buf.remaining()));
                }
                let mut table = OwnershipTable::new(peers, segments);
                for row in table.rows.iter_mut() {
                    buf.copy_to_slice(row);
                }
                Ok(Message::PeerListReply { file, table })
            }
            MessageCode::SegmentRequest => {
                if buf.remaining() < 8 {
                    return Err(frame_too_short(code, 8, buf.remaining()));
                }
                let file = buf.get_u32();
                let segment = buf.get_u32();
                if file == SHUTDOWN_SENTINEL && segment == SHUTDOWN_SENTINEL {
                    return Ok(Message::Shutdown);
                }
                Ok(Message::SegmentRequest { file: FileId(file), segment })
            }
            MessageCode::SegmentReply => {
                if buf.remaining() < SEGMENT_ID_LEN {
                    return Err(frame_too_short(code, SEGMENT_ID_LEN, buf.remaining()));
                }
                let mut raw = [0u8; SEGMENT_ID_LEN];
                buf.copy_to_slice(&mut raw);
                Ok(Message::SegmentReply { id: SegmentId::from_bytes(&raw)? })
            }
            MessageCode::SegmentAcquired => {
                if buf.remaining() < 8 {
                    return Err(frame_too_short(code, 8, buf.remaining()));
                }
                let file = FileId(buf.get_u32());
                let segment = buf.get_u32();
                Ok(Message::SegmentAcquired { file, segment })
            }
            MessageCode::FileComplete => {
                if buf.remaining() < 4 {
                    return Err(frame_too_short(code, 4, buf.remaining()));
                }
                Ok(Message::FileComplete { file: FileId(buf.get_u32()) })
            }
            MessageCode::AllFilesComplete => Ok(Message::AllFilesComplete),
        }
    }
}

fn frame_too_short(code: MessageCode, expected: usize, got: usize) -> anyhow::Error {
    error!("{:?} frame too short: expected {} bytes, got {}", code, expected, got);
    SwarmError::protocol_error_with_source(
        "Message frame too short",
        format!("{:?}: expected {} bytes, got {}", code, expected, got),
    )
    .into()
}

//! Core constants for the facegate terminal.
//!
//! This module centralizes the wire-level constants of the decision frame
//! protocol together with the default tuning values of the matching engine
//! and the serial link.
//!
//! # Frame Layout
//!
//! Every decision sent to the door controller is a single binary frame:
//!
//! ```text
//! SOF  CMD  LEN  PAYLOAD...  CHECKSUM  EOF
//! 0xFF u8   u8   LEN bytes   u8        0xFE
//! ```
//!
//! Where `CHECKSUM = (CMD + LEN + sum(PAYLOAD)) mod 256`.
//!
//! # Usage
//!
//! ```
//! use facegate_core::constants::*;
//!
//! assert_eq!(FRAME_OVERHEAD, 5);
//! assert_eq!(MAX_PAYLOAD_LEN, u8::MAX as usize);
//! ```

// ============================================================================
// Frame Markers
// ============================================================================

/// Start-of-frame marker.
pub const START_BYTE: u8 = 0xFF;

/// End-of-frame marker.
pub const END_BYTE: u8 = 0xFE;

/// Bytes a frame adds around its payload: SOF, CMD, LEN, CHECKSUM, EOF.
pub const FRAME_OVERHEAD: usize = 5;

/// Largest payload that fits the single-byte LEN field.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Largest complete frame on the wire.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + FRAME_OVERHEAD;

// ============================================================================
// Command Codes
// ============================================================================

/// Access rejected. Always carries an empty payload.
pub const CMD_REJECT: u8 = 0x00;

/// Access granted. Payload is the UTF-8 identity name.
pub const CMD_ACCEPT: u8 = 0x01;

// ============================================================================
// Serial Link
// ============================================================================

/// Baud rate the door controller firmware listens at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read timeout applied while acquiring the port (milliseconds).
///
/// Only bounds the acquisition probe; writes are not time-limited.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

// ============================================================================
// Matching
// ============================================================================

/// Acceptance threshold for the histogram strategy.
pub const DEFAULT_HISTOGRAM_THRESHOLD: f64 = 0.6;

/// Acceptance threshold for the structural strategy.
pub const DEFAULT_STRUCTURAL_THRESHOLD: f64 = 0.5;

/// Bins per colour channel of the joint histogram.
pub const DEFAULT_HISTOGRAM_BINS: u16 = 256;

/// Side of the square window the structural index averages over.
pub const SSIM_WINDOW: u32 = 7;

/// File extensions recognised as enrolled reference images (lower-case).
pub const REFERENCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extension new registrations are written with.
pub const REGISTRATION_EXTENSION: &str = "jpg";

// ============================================================================
// External Resolver Sentinels
// ============================================================================

/// Output of the external classifier when a face was seen but not matched.
pub const SENTINEL_UNKNOWN_PERSON: &str = "unknown_person";

/// Output of the external classifier when no face was found in the probe.
pub const SENTINEL_NO_PERSONS_FOUND: &str = "no_persons_found";

//! Shared primitive types used across the dashboard core.

/// Primary key of a customer and the join key from transactions.
pub type CustomerId = String;

/// A precomputed segment (cluster) label. The core never names segments;
/// display names belong to whoever renders the results.
pub type SegmentId = u8;

/// Segment universe used when no configuration says otherwise.
pub const DEFAULT_SEGMENTS: [SegmentId; 2] = [0, 1];

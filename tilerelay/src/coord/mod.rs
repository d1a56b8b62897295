//! Tile key types
//!
//! A tile is addressed by the usual slippy-map triple `(zoom, x, y)`. The
//! canonical string form `/{zoom}/{x}/{y}` doubles as the relative cache path
//! and as the key used for request coalescing.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Maximum zoom level accepted from requests.
///
/// Slippy-map providers stop well below this; the bound only keeps
/// `2^zoom` representable in a `u32`.
pub const MAX_ZOOM: u8 = 31;

/// File suffix tolerated on the final path segment (`/3/4/1.png`).
pub const TILE_SUFFIX: &str = ".png";

/// Errors produced when parsing a tile key from request path segments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// A segment was not a non-negative integer.
    #[error("Invalid {name} segment '{value}': expected a non-negative integer")]
    InvalidSegment { name: &'static str, value: String },

    /// Zoom level above [`MAX_ZOOM`].
    #[error("Zoom level {0} exceeds maximum of {MAX_ZOOM}")]
    ZoomOutOfRange(u32),
}

/// Identifies a single map tile.
///
/// Immutable once constructed. Two keys are equal when all three
/// coordinates are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Zoom level
    pub zoom: u8,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl TileKey {
    /// Creates a tile key from its coordinates.
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Parses a tile key from the three request path segments.
    ///
    /// The `y` segment may carry a trailing `.png`, which is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError`] if a segment is not a non-negative integer or the
    /// zoom level is above [`MAX_ZOOM`].
    pub fn from_segments(zoom: &str, x: &str, y: &str) -> Result<Self, CoordError> {
        let zoom = parse_segment("zoom", zoom)?;
        if zoom > u32::from(MAX_ZOOM) {
            return Err(CoordError::ZoomOutOfRange(zoom));
        }
        let x = parse_segment("x", x)?;
        let y = parse_segment("y", y.strip_suffix(TILE_SUFFIX).unwrap_or(y))?;

        Ok(Self {
            // Bounded by MAX_ZOOM above
            zoom: zoom as u8,
            x,
            y,
        })
    }

    /// Relative path of this tile below a cache root: `{zoom}/{x}/{y}`.
    pub fn relative_path(&self) -> PathBuf {
        [
            self.zoom.to_string(),
            self.x.to_string(),
            self.y.to_string(),
        ]
        .iter()
        .collect()
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", self.zoom, self.x, self.y)
    }
}

fn parse_segment(name: &'static str, value: &str) -> Result<u32, CoordError> {
    // u32::from_str accepts a leading '+', which is not a valid path segment here
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoordError::InvalidSegment {
            name,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| CoordError::InvalidSegment {
        name,
        value: value.to_string(),
    })
}

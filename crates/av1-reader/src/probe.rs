//! Locating the first sequence header of a stream.

use av1::ObuType;
use av1::seq::SequenceHeaderObu;
use tracing::{debug, warn};

use crate::cursor::ObuCursor;
use crate::error::OpenError;
use crate::geometry::Geometry;

/// What the first valid sequence header says about a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Coded geometry.
    pub geometry: Geometry,
    /// Frame rate from the header's timing info, if present.
    pub frame_rate: Option<f64>,
}

/// Scans `cursor` for the first sequence header that parses.
///
/// Headers that fail to parse are skipped. The cursor is rewound to the
/// start of the stream whatever the outcome.
pub fn probe(cursor: &mut ObuCursor) -> Result<StreamInfo, OpenError> {
    let result = scan(cursor);
    cursor.rewind();
    result
}

fn scan(cursor: &mut ObuCursor) -> Result<StreamInfo, OpenError> {
    loop {
        let unit = match cursor.peek() {
            Ok(Some(unit)) => unit,
            Ok(None) => return Err(OpenError::NoSequenceHeaderFound),
            Err(e) => {
                warn!(
                    offset = cursor.offset(),
                    error = %e,
                    "Malformed OBU while probing, stopping scan"
                );
                return Err(OpenError::NoSequenceHeaderFound);
            }
        };
        cursor.advance();

        if unit.obu_type != ObuType::SequenceHeader {
            continue;
        }

        let header = match SequenceHeaderObu::parse(unit.payload()) {
            Ok(header) => header,
            Err(e) => {
                warn!(offset = unit.offset, error = %e, "Skipping unparsable sequence header");
                continue;
            }
        };

        let Some(geometry) = Geometry::from_sequence_header(&header) else {
            warn!(offset = unit.offset, "Skipping sequence header with invalid subsampling");
            continue;
        };

        if !geometry.pixel_layout.has_chroma() {
            return Err(OpenError::UnsupportedMonochromeLayout);
        }

        let frame_rate = header.frame_rate();
        debug!(
            offset = unit.offset,
            width = geometry.width,
            height = geometry.height,
            layout = ?geometry.pixel_layout,
            bit_depth = geometry.bit_depth,
            ?frame_rate,
            "Found sequence header"
        );

        return Ok(StreamInfo { geometry, frame_rate });
    }
}

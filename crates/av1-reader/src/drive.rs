//! The send/receive loop that turns OBUs into one decoded picture.

use tracing::{debug, trace, warn};

use crate::cursor::ObuCursor;
use crate::engine::{Attempt, DecodeEngine};
use crate::error::{DecodeError, EngineError};
use crate::picture::Picture;
use crate::pool::PicturePool;

/// Feeds units from `cursor` into `engine` until it yields a picture.
///
/// Returns `Ok(None)` once the input is exhausted and the engine has
/// nothing left to drain. `eof` is set as soon as no unit remains; a
/// malformed unit is logged and treated the same way.
///
/// A refused unit is offered again after polling the engine once. After
/// `stall_retries` consecutive refusals with nothing to receive, the engine
/// is considered stalled.
pub(crate) fn decode_next<E: DecodeEngine + ?Sized>(
    engine: &mut E,
    cursor: &mut ObuCursor,
    pool: &mut PicturePool,
    eof: &mut bool,
    stall_retries: usize,
) -> Result<Option<Picture>, DecodeError> {
    let mut refusals = 0;
    loop {
        if *eof {
            return match receive(engine, pool)? {
                Attempt::Ready(picture) => Ok(Some(picture)),
                Attempt::WouldBlock => {
                    trace!("Engine drained");
                    Ok(None)
                }
            };
        }

        let unit = match cursor.peek() {
            Ok(Some(unit)) => unit,
            Ok(None) => {
                debug!(offset = cursor.offset(), "Reached end of stream");
                *eof = true;
                continue;
            }
            Err(e) => {
                warn!(
                    offset = cursor.offset(),
                    error = %e,
                    "Malformed OBU, treating as end of stream"
                );
                *eof = true;
                continue;
            }
        };

        let offset = unit.offset;
        let obu_type = unit.obu_type;
        match engine.send(unit.data).map_err(DecodeError::SendFailed)? {
            Attempt::Ready(()) => {
                trace!(offset, ?obu_type, "Sent unit");
                refusals = 0;
                cursor.advance();
                if cursor.is_exhausted() {
                    debug!(offset = cursor.offset(), "Consumed last unit");
                    *eof = true;
                }
            }
            Attempt::WouldBlock => {
                // The cursor stays on the unit, so the next pass resends it.
                trace!(
                    offset,
                    ?obu_type,
                    refusals,
                    "Engine refused unit, polling for a picture"
                );
                if let Attempt::Ready(picture) = receive(engine, pool)? {
                    return Ok(Some(picture));
                }
                if refusals >= stall_retries {
                    warn!(offset, refusals, "Engine neither accepts input nor yields pictures");
                    return Err(DecodeError::SendFailed(EngineError::Stalled));
                }
                refusals += 1;
                continue;
            }
        }

        if let Attempt::Ready(picture) = receive(engine, pool)? {
            return Ok(Some(picture));
        }
    }
}

fn receive<E: DecodeEngine + ?Sized>(
    engine: &mut E,
    pool: &mut PicturePool,
) -> Result<Attempt<Picture>, DecodeError> {
    engine.receive_picture(pool).map_err(DecodeError::ReceiveFailed)
}

//! Debug dump of a decoded frame, emitted through the logging crate.

use logging::Priority;

use crate::message::Message;

/// Logs a frame's header and payload at [`Priority::Debug`].
///
/// Both ends call this on every message they process; the cost is one
/// `enabled` check unless the debug threshold is active.
pub fn dump(msg: &Message) {
    if !logging::enabled(Priority::Debug) {
        return;
    }

    let name = msg
        .code()
        .map_or_else(|| format!("type {}", msg.raw_code()), |code| code.name().to_owned());

    if msg.payload_len() == 0 {
        logging::log_debug!("frame {name} options={:#x} length=0", msg.options());
    } else {
        logging::log_debug!(
            "frame {name} options={:#x} length={} payload={:?}",
            msg.options(),
            msg.payload_len(),
            String::from_utf8_lossy(msg.payload()),
        );
    }
}

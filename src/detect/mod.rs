//! Sign detection: per-frame prediction parsing and the announce debouncer.
//!
//! The inference pipeline itself runs out of process. This module only sees
//! its per-frame output (`PredictionFrame`) and decides, frame by frame,
//! whether the dominant sign is worth announcing.

mod debounce;
mod result;
mod source;

pub use debounce::{
    AnnounceState, Decision, SignDebouncer, SignUpdate, DEFAULT_THROTTLE_INTERVAL, NONE_SIGN,
};
pub use result::{dominant, Detection, PredictionFrame, Predictions};
pub use source::PredictionLines;

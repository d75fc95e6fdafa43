//! Domain Layer
//!
//! Pure types and rules of the market overview: the field resolver, the
//! aggregate payload model, section configuration, cell formatting, the
//! bilingual dictionary, the streaming accumulator, and the screen state
//! machine. Nothing here performs I/O.

pub mod fields;
pub mod format;
pub mod language;
pub mod overview;
pub mod rendered;
pub mod sections;
pub mod stream_session;
pub mod view_state;

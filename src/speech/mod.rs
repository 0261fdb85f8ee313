//! Client for the full-duplex streaming speech service.
//!
//! ```text
//!            ┌── POST /up?…&pair=K ──── FLAC bytes ───▶┐
//!  fetch() ──┤                                        service
//!            └── GET /down?pair=K ◀── NDJSON results ─┘
//! ```

pub mod fetcher;
pub mod response;
pub mod session;
pub mod transport;

pub use fetcher::TranscriptFetcher;
pub use response::{ResponseError, parse_final_transcript, recognition_body};
pub use session::{PairingKey, ServiceEndpoint};
pub use transport::{HttpTransport, MockTransport, RecordedUpload, StreamTransport};

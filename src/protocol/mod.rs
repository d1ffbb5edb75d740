//! Wire protocol for the agent stream: the event vocabulary and the frame
//! decoder that reassembles records from raw transport chunks.

mod decoder;
mod event;

pub use decoder::{FrameDecoder, Framing};
pub use event::{
    decode_record, ChatRole, ChatTurn, DocumentItem, FileListing, FinalSummary, OneOrMany,
    ReadFileResult, SearchResult, SearchResultUrl, StreamEvent,
};

pub mod buffer;
pub mod cipher;
pub mod codec;
pub mod frame;
pub mod handshake;
pub mod protocol;

pub use buffer::{Buffer, Cursor, CursorError, CursorMode};
pub use cipher::{Key, KeyPair};
pub use codec::MessageChannel;

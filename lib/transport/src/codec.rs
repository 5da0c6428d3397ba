//! Encrypt-on-send / decrypt-on-recv wrapper around [`crate::frame`] (spec §4.5).
//!
//! Key pairing is asymmetric across the connection: each side encrypts its own
//! outgoing traffic with *its own* private key, and decrypts incoming traffic with
//! the *peer's* public key. This is a signing orientation, not confidentiality -
//! preserved here for wire compatibility with the reference design (see design
//! notes, flag 7).

use crate::buffer::Buffer;
use crate::cipher::{self, Key};
use crate::frame::{self, Result};
use std::net::TcpStream;

/// Owns the raw socket plus the two keys needed to talk to one peer.
pub struct MessageChannel {
    stream: TcpStream,
    own_private: Key,
    peer_public: Key,
}

impl MessageChannel {
    pub fn new(stream: TcpStream, own_private: Key, peer_public: Key) -> MessageChannel {
        MessageChannel {
            stream,
            own_private,
            peer_public,
        }
    }

    pub fn peer_addr_string(&self) -> String {
        self.stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string())
    }

    /// Encrypts `plaintext` with our own private key and sends it as one framed
    /// message. The on-wire length is the *encrypted* byte count - always a
    /// multiple of 8, one `u64` block per plaintext block.
    pub fn send(&mut self, plaintext: &Buffer) -> Result<()> {
        let blocks = cipher::encrypt(&self.own_private, plaintext.as_slice());
        let mut wire = Vec::with_capacity(blocks.len() * 8);
        for block in &blocks {
            wire.extend_from_slice(&block.to_ne_bytes());
        }
        frame::send_framed(&mut self.stream, &wire)
    }

    /// Receives one framed ciphertext message and decrypts it with the peer's
    /// public key, returning a buffer sized exactly to the recovered plaintext. The
    /// recovered length may exceed the original message by up to `block_bytes - 1`
    /// trailing zero bytes (spec §4.2); callers that need an exact length must have
    /// transmitted it explicitly.
    pub fn recv(&mut self) -> Result<Buffer> {
        let mut wire = Vec::new();
        frame::recv_framed(&mut self.stream, &mut wire)?;

        let blocks: Vec<u64> = wire
            .chunks_exact(8)
            .map(|chunk| {
                let mut array = [0u8; 8];
                array.copy_from_slice(chunk);
                u64::from_ne_bytes(array)
            })
            .collect();

        let decoded = cipher::decrypt(&self.peer_public, &blocks);
        let mut plaintext = Buffer::new(decoded.len());
        plaintext
            .resize(decoded.len())
            .map_err(|_| flux::TransportError(flux::ErrorKind::BufferFull))?;
        plaintext.as_mut_slice().copy_from_slice(&decoded);
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CursorMode;
    use crate::cipher::generate_keypair;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn encrypted_message_roundtrips() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut rng = StdRng::seed_from_u64(1234);
        let client_pair = generate_keypair(&mut rng);
        let server_pair = generate_keypair(&mut rng);

        let client_public = client_pair.public;
        let server_public = server_pair.public;

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut channel = MessageChannel::new(stream, server_pair.private, client_public);
            let plain = channel.recv().unwrap();
            plain.as_slice().to_vec()
        });

        let client_stream = TcpStream::connect(addr).unwrap();
        let mut client_channel = MessageChannel::new(client_stream, client_pair.private, server_public);

        let mut outgoing = Buffer::new(256);
        {
            let mut cur = outgoing.cursor(CursorMode::Write);
            cur.write_bytes(b"hello server").unwrap();
        }
        client_channel.send(&outgoing).unwrap();

        let received = server.join().unwrap();
        assert_eq!(&received[..b"hello server".len()], b"hello server");
    }
}

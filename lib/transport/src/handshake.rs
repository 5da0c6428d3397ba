//! Two-message public-key exchange that installs the encryption keys used by
//! [`crate::codec::MessageChannel`] (spec §4.4).
//!
//! The handshake payload itself travels in the clear (it has to - there is no shared
//! key yet), but is still length-framed like every other message.

use crate::cipher::{self, Key, KeyPair};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flux::logging::{debug, Logger};
use flux::TransportError;
use rand::Rng;
use std::net::TcpStream;

use crate::frame::{self, Result};

fn encode_key(key: &Key) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.write_u64::<BigEndian>(key.exponent).unwrap();
    out.write_u64::<BigEndian>(key.modulus).unwrap();
    out
}

fn decode_key(mut bytes: &[u8]) -> Result<Key> {
    let exponent = bytes
        .read_u64::<BigEndian>()
        .map_err(|_| TransportError(flux::ErrorKind::ShortRead))?;
    let modulus = bytes
        .read_u64::<BigEndian>()
        .map_err(|_| TransportError(flux::ErrorKind::ShortRead))?;
    Ok(Key { exponent, modulus })
}

/// Client side: generate a key pair, send the public half, receive the server's.
/// Returns `(own_keypair, peer_public_key)`.
pub fn client_handshake<R: Rng>(stream: &mut TcpStream, rng: &mut R, log: &Logger) -> Result<(KeyPair, Key)> {
    let keypair = cipher::generate_keypair(rng);

    frame::send_framed(stream, &encode_key(&keypair.public))?;
    debug!(log, "handshake: sent public key"; "modulus" => keypair.public.modulus);

    let mut reply = Vec::new();
    frame::recv_framed(stream, &mut reply)?;
    let peer_public = decode_key(&reply)?;
    debug!(log, "handshake: received server public key"; "modulus" => peer_public.modulus);

    Ok((keypair, peer_public))
}

/// Server side: receive the client's public key first (its modulus dictates the
/// block size for the whole connection), then generate and send our own key pair.
/// Returns `(own_keypair, peer_public_key)`.
pub fn server_handshake<R: Rng>(stream: &mut TcpStream, rng: &mut R, log: &Logger) -> Result<(KeyPair, Key)> {
    let mut request = Vec::new();
    frame::recv_framed(stream, &mut request)?;
    let peer_public = decode_key(&request)?;
    debug!(log, "handshake: received client public key"; "modulus" => peer_public.modulus);

    let keypair = cipher::generate_keypair(rng);
    frame::send_framed(stream, &encode_key(&keypair.public))?;
    debug!(log, "handshake: sent public key"; "modulus" => keypair.public.modulus);

    Ok((keypair, peer_public))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux::logging;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn client_and_server_exchange_public_keys() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let log = logging::init(false);
        let server_log = log.clone();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut rng = StdRng::seed_from_u64(7);
            server_handshake(&mut stream, &mut rng, &server_log).unwrap()
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let (client_pair, server_public) = client_handshake(&mut client, &mut rng, &log).unwrap();

        let (server_pair, client_public) = server.join().unwrap();

        assert_eq!(client_pair.public, client_public);
        assert_eq!(server_pair.public, server_public);
    }
}

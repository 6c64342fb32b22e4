/*
 * sync_transfer.rs
 * Copyright (C) 2026 webclient_core contributors
 *
 * This file is part of webclient_core.
 *
 * webclient_core is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * webclient_core is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with webclient_core.  If not, see <http://www.gnu.org/licenses/>.
 */

//! The one blocking, non-chain entry point: connect, send one packet, parse
//! one response, return. Shares [`HttpDataObject`] (C4) with the chain-driven
//! path in [`crate::webclient`] — the same incremental `(&mut begin, end)`
//! assembler drives both, only the I/O around it differs.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::{Result, WebclientError};
use crate::http::{Assembled, HttpDataObject, HttpHeader};

/// Blocking connect, send `bytes`, and read until one full HTTP response is
/// assembled or `timeout` elapses. Every failure path drops the socket
/// (`TcpStream`'s `Drop` closes it) before returning `Err`.
pub fn transfer(
    addr: SocketAddr,
    bytes: &[u8],
    timeout: Duration,
    recv_size_hint: usize,
) -> Result<HttpHeader<'static>> {
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(WebclientError::FailConnect)?;
    stream.set_read_timeout(Some(timeout)).map_err(WebclientError::Io)?;
    stream.set_write_timeout(Some(timeout)).map_err(WebclientError::Io)?;

    send_all(&stream, bytes)?;

    let mut dataobject = HttpDataObject::new(recv_size_hint);
    let mut recv_buf = vec![0u8; recv_size_hint.max(1)];
    let mut stream = stream;

    loop {
        let n = match stream.read(&mut recv_buf) {
            Ok(0) => return Err(WebclientError::PeerClosed),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(WebclientError::Timeout)
            }
            Err(e) => return Err(WebclientError::FailRecv(e)),
        };

        let mut begin = 0usize;
        match dataobject.process(&recv_buf, &mut begin, n) {
            Ok(Assembled::Full(header)) => return Ok(header.to_owned_header()),
            Ok(Assembled::NeedMore) => continue,
            Err(e) => return Err(e),
        }
    }
}

fn send_all(mut stream: &TcpStream, bytes: &[u8]) -> Result<()> {
    let mut sent = 0usize;
    while sent < bytes.len() {
        let n = stream.write(&bytes[sent..]).map_err(WebclientError::FailSend)?;
        if n == 0 {
            return Err(WebclientError::FailSend(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short send",
            )));
        }
        sent += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn transfers_one_content_length_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut req = [0u8; 256];
            let n = sock.read(&mut req).unwrap();
            assert!(n > 0);
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK").unwrap();
        });

        let header = transfer(
            addr,
            b"GET / HTTP/1.1\r\nHost: x\r\n\r\n",
            Duration::from_secs(2),
            512,
        )
        .unwrap();
        assert_eq!(header.body.unwrap().into_owned(), b"OK".to_vec());
        server.join().unwrap();
    }

    #[test]
    fn peer_closed_before_any_bytes_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            drop(sock);
        });

        let err = transfer(addr, b"GET / HTTP/1.1\r\n\r\n", Duration::from_secs(2), 512).unwrap_err();
        assert!(matches!(err, WebclientError::PeerClosed));
        server.join().unwrap();
    }
}

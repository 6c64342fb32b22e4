/*
 * socket_pair.rs
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

//! `create_socket_pair`: two connected sockets, either half readable/writable
//! by the other end. Used as the reactor chain's self-pipe wakeup (see
//! `reactor::chain`), and exposed here as a standalone primitive.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::os::unix::net::UnixStream;

/// Socket domain for [`create_socket_pair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Unix,
    Inet,
}

/// One half of a connected socket pair. Either variant is a plain
/// byte-stream: `Read`/`Write` forward to the underlying OS socket.
pub enum SocketHalf {
    Unix(UnixStream),
    Inet(TcpStream),
}

impl SocketHalf {
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            SocketHalf::Unix(s) => s.set_nonblocking(nonblocking),
            SocketHalf::Inet(s) => s.set_nonblocking(nonblocking),
        }
    }
}

impl io::Read for SocketHalf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SocketHalf::Unix(s) => s.read(buf),
            SocketHalf::Inet(s) => s.read(buf),
        }
    }
}

impl io::Write for SocketHalf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SocketHalf::Unix(s) => s.write(buf),
            SocketHalf::Inet(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SocketHalf::Unix(s) => s.flush(),
            SocketHalf::Inet(s) => s.flush(),
        }
    }
}

/// Create a connected pair of sockets. `AF_UNIX` uses the OS primitive
/// directly; `AF_INET` (stream only) binds a loopback listener on an
/// ephemeral port, connects to it non-blocking, accepts, then closes the
/// listener and restores blocking mode — there is no `socketpair(2)` for
/// `AF_INET`.
pub fn create_socket_pair(domain: Domain) -> io::Result<(SocketHalf, SocketHalf)> {
    match domain {
        Domain::Unix => {
            let (a, b) = UnixStream::pair()?;
            Ok((SocketHalf::Unix(a), SocketHalf::Unix(b)))
        }
        Domain::Inet => {
            let listener = TcpListener::bind(("127.0.0.1", 0))?;
            let addr = listener.local_addr()?;
            let client = TcpStream::connect(addr)?;
            client.set_nonblocking(true)?;
            let (server, _) = listener.accept()?;
            drop(listener);
            client.set_nonblocking(false)?;
            client.set_nodelay(true).ok();
            server.set_nodelay(true).ok();
            Ok((SocketHalf::Inet(client), SocketHalf::Inet(server)))
        }
    }
}

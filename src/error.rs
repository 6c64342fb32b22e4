/*
 * error.rs
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

//! Error taxonomy shared by the parser, acsocket, and webclient layers.

use std::io;

/// Every error kind the engine can surface, grouped the way the design
/// document groups them (input validation, HTTP protocol, socket I/O,
/// resource exhaustion, lifecycle misuse).
#[derive(Debug, thiserror::Error)]
pub enum WebclientError {
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),
    #[error("invalid URI: {0}")]
    InvalidUri(String),
    #[error("invalid header line: {0}")]
    InvalidHeaderLine(String),
    #[error("missing closing quote")]
    MissingQuote,

    #[error("corrupted HTTP message: {0}")]
    CorruptedHttpMessage(String),
    #[error("corrupted chunk data: {0}")]
    CorruptedChunkData(String),
    #[error("header not found: {0}")]
    HeaderNotFound(String),
    #[error("buffer too small (needed at least {needed} bytes, have {have})")]
    BufferTooSmall { needed: usize, have: usize },

    #[error("failed to create socket: {0}")]
    FailCreateSocket(#[source] io::Error),
    #[error("failed to connect: {0}")]
    FailConnect(#[source] io::Error),
    #[error("failed to send: {0}")]
    FailSend(#[source] io::Error),
    #[error("failed to receive: {0}")]
    FailRecv(#[source] io::Error),
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("local side closed the connection")]
    LocalClosed,
    #[error("connection not set up")]
    ConnectionNotSetup,
    #[error("socket pool is full")]
    SocketPoolEmpty,
    #[error("operation timed out")]
    Timeout,

    #[error("out of memory")]
    OutOfMemory,
    #[error("queue is full")]
    QueueFull,

    #[error("not initialized")]
    NotInitialized,
    #[error("already exists")]
    AlreadyExists,
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, WebclientError>;

/*
 * mod.rs
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

//! HTTP/1.x packet model, chunked-body decoder, and incremental response
//! assembler (no HTTP/2, no gzip/deflate — see crate-level Non-goals).

pub mod chunk;
pub mod dataobject;
pub mod header;

pub use chunk::ChunkProcessor;
pub use dataobject::{Assembled, HttpDataObject};
pub use header::{HttpHeader, StartLine, TransferEncoding};

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

//! Per-destination webclient state machine (`session`), the pool that owns
//! acsocket/utimer and drives every transition (`pool`), queued outbound
//! requests (`request`), and the public, thread-safe entry point (`facade`).

pub mod facade;
pub mod pool;
pub mod request;
pub mod session;

pub use facade::{Event, Webclient};
pub use pool::DataObjectPool;
pub use request::WebclientRequest;
pub use session::{DestinationSession, PipelineFlag, State};

// Copyright 2018 the jobhub authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The dispatch engine: connection state, the job table, the function
//! registry and command handling for the job-dispatch server. This crate
//! knows nothing about sockets, threads or configuration files — it is
//! pure data-model logic that the `jobhub-server` binary drives.

pub mod admin;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod function_registry;
pub mod ids;
pub mod job;
pub mod server;

pub use connection::{ClientState, ConnRole, Connection, WorkerState};
pub use dispatch::{dispatch, handle_disconnect, overdue_workers, Outbound};
pub use error::DispatchError;
pub use function_registry::{FunctionEntry, FunctionRegistry};
pub use ids::{ConnId, JobId, Priority};
pub use job::Job;
pub use server::{Server, ShutdownMode};

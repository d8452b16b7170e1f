// EDP - EVM Deployment Pipeline
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod artifact;
pub use artifact::*;

pub mod assets;
pub use assets::*;

pub mod batch;
pub use batch::*;

pub mod compiler;
pub use compiler::*;

pub mod config;
pub use config::*;

pub mod context;
pub use context::*;

pub mod deployer;
pub use deployer::*;

pub mod error;
pub use error::*;

pub mod ledger;
pub use ledger::*;

pub mod pipeline;
pub use pipeline::*;

pub mod source;
pub use source::*;

pub mod test_utils;

// SPDX-License-Identifier: MIT
pub mod header;
pub mod history;
pub mod sources;

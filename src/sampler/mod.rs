// SPDX-License-Identifier: MIT
pub mod detect;
pub mod reader;
pub mod reduce;
pub mod window;

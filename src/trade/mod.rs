// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

pub mod builder;
pub mod registry;
pub mod set;
pub mod tracker;

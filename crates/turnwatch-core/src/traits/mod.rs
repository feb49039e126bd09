// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the tracking engine and its external collaborators.

pub mod channel;

pub use channel::{EventSource, Notifier};

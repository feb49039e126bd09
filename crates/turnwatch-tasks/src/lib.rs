// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background jobs that run alongside the event loop: the escalation
//! scanner and the daily rollup aggregator. Both are interval-driven and
//! stop cooperatively via a [`tokio_util::sync::CancellationToken`].

pub mod aggregator;
pub mod escalation;

pub use aggregator::DailyAggregator;
pub use escalation::EscalationScanner;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O

pub mod broker;
mod env;
pub mod process;

pub use broker::{
    Broker, BrokerError, BusMessage, MemoryBroker, MemorySubscription, Subscription,
    SubscriptionHandle, TcpBroker, TcpSubscription, TracedBroker, DEFAULT_BROKER_ADDR,
};
pub use process::{ProcessRunner, RunError, RunOutcome, RunnerConfig};

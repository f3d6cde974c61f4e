//! Platform abstraction layer for the monotonic time source.
//!
//! This module allows switching between the real operating system clock
//! and a fake clock whose time tests advance by hand.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::Platform;
pub(crate) use facade::PlatformFacade;
#[cfg(test)]
pub(crate) use fake::FakePlatform;
pub(crate) use real::RealPlatform;

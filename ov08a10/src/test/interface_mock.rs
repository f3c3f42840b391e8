// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::interface::{InterfaceConfig, VideoInterface};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InterfaceCall {
    Configure(InterfaceConfig),
    Init,
    Start(u8),
    Deinit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct MockInterfaceError;

/// A video receiver that records what it was asked to do.
///
/// Clones share the same call log, so a copy can be kept to inspect calls made by a driver.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockInterface {
    calls: Rc<RefCell<Vec<InterfaceCall>>>,
    fail_configure: Rc<RefCell<bool>>,
}

impl MockInterface {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<InterfaceCall> {
        self.calls.borrow().clone()
    }

    /// The most recent configuration applied.
    pub(crate) fn last_config(&self) -> Option<InterfaceConfig> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            InterfaceCall::Configure(config) => Some(*config),
            _ => None,
        })
    }

    pub(crate) fn clear(&self) {
        self.calls.borrow_mut().clear()
    }

    pub(crate) fn fail_configure(&self, fail: bool) {
        *self.fail_configure.borrow_mut() = fail;
    }

    fn record(&self, call: InterfaceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl VideoInterface for MockInterface {
    type Error = MockInterfaceError;

    fn configure(&mut self, config: &InterfaceConfig) -> Result<(), Self::Error> {
        if *self.fail_configure.borrow() {
            return Err(MockInterfaceError);
        }
        self.record(InterfaceCall::Configure(*config));
        Ok(())
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        self.record(InterfaceCall::Init);
        Ok(())
    }

    fn start(&mut self, channel: u8) -> Result<(), Self::Error> {
        self.record(InterfaceCall::Start(channel));
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), Self::Error> {
        self.record(InterfaceCall::Deinit);
        Ok(())
    }
}

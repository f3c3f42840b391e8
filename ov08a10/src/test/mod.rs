// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
mod interface_mock;
mod modes;

pub(crate) use interface_mock::{InterfaceCall, MockInterface};
pub(crate) use modes::{dol2_mode, dol3_mode, MODES_WITH_WDR};

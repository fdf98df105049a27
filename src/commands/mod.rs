// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod categories;
pub mod classify;
pub mod config;
pub mod importer;
pub mod ledger;
pub mod rules;
pub mod statements;
pub mod transactions;

mod common;
mod core;

pub use common::*;
pub use core::*;
pub use rust_decimal::Decimal;
pub use shared::{cryptography::*, hash::*};

pub(crate) use anyhow::{Context, Result};
pub(crate) use std::collections::{BTreeMap, BTreeSet};

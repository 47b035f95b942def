// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing: symbol detection, record parsing and dedup

pub mod dedup;
pub mod record;
pub mod tasks;
pub mod types;

pub use dedup::Deduplicator;
pub use record::parse;
pub use tasks::{QrDetector, SymbolDecoder};
pub use types::{DecodedRecord, FrameRegion, Price, RawSymbol, ScanRegion};

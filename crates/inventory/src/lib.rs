//! Inventory domain module: goods received (entries) and non-sale stock
//! removals (product exits).
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod entry;
pub mod exit;

pub use entry::{Entry, EntryDraft, EntryId, EntryItem, EntryLine, NewEntry, NewEntryLine};
pub use exit::{ExitDraft, ExitItem, NewProductExit, ProductExit, ProductExitId};

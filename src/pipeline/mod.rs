//! Pipeline stages for CV extraction.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ text ──▶ segment ──▶ schedule ─┬─▶ extract ──▶ response ──▶ clean
//! (paths)   (pdfium)  (lines)  (documents) (queue +   │   (LLM,       (fence,      (rules)
//!                                           batches)  │    retries)    JSON)
//! ```
//!
//! 1. [`input`]   : validate paths and expand directories
//! 2. [`decode`]  : read positioned text fragments; runs in `spawn_blocking`
//! 3. [`text`]    : rebuild lines from vertical positions
//! 4. [`segment`] : split pages into one document per candidate
//! 5. [`schedule`]: rate-limited FIFO queue driven in batches
//! 6. [`extract`] : prompt the model with bounded, ladder-based retries
//! 7. [`response`]: strip code fences and parse the JSON answer
//! 8. [`clean`]   : trim, drop incomplete entries, cap and filter roles

pub mod clean;
pub mod decode;
pub mod extract;
pub mod input;
pub mod response;
pub mod schedule;
pub mod segment;
pub mod text;

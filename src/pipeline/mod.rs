//! The three client components of a conversion job.
//!
//! Each submodule owns exactly one step of the job lifecycle, so each is
//! independently testable against a scripted [`crate::service::JobService`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ submit ──▶ monitor ──▶ retrieve
//! (path/URL)  (job id)   (poll loop)  (preview, docx/html/md, zip)
//! ```
//!
//! 1. [`input`]    — resolve a path or URL and validate it locally
//! 2. [`submit`]   — one upload / URL submission, returns the job id
//! 3. [`monitor`]  — the only time-driven step: fixed-interval polling until
//!    `completed` or `failed`, then a single preview fetch
//! 4. [`retrieve`] — on-demand downloads, any number of times after completion

pub mod input;
pub mod monitor;
pub mod retrieve;
pub mod submit;

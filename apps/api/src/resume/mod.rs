//! Resumes: the aggregated document, the editor form, the transactional save
//! workflow, markdown export and the HTTP handlers on top of them.

pub mod aggregate;
pub mod form;
pub mod handlers;
pub mod render;
pub mod save;

//! Message envelope shared by binders, codecs and partition routers.
//!
//! A [`domain::Message`] pairs a payload with an ordered set of headers. The
//! envelope is immutable once built; builders consume and return `self`.

pub mod domain;

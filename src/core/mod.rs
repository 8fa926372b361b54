//! Core building blocks of the gateway: audio transcoding, agent session
//! establishment and wire schema, outbound telephony, and post-call lead
//! extraction.

pub mod agent;
pub mod audio;
pub mod leads;
pub mod telephony;

//! AURA NLP - Command Understanding
//!
//! Free text in, [`aura_core::CommandIntent`] out: pattern-based entity
//! extraction plus a small trainable intent classifier with a remote
//! fallback for uncertain input.

pub mod classifier;
pub mod extractor;
pub mod remote;
pub mod suggest;

pub use classifier::{
    IntentClassifier, NaiveBayes, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_REMOTE_TIMEOUT,
    TRAINING_SET, TRAINING_SET_VERSION, UNKNOWN_LABEL,
};
pub use extractor::{extract, SPECIALIZATIONS};
pub use remote::{HttpRemoteClassifier, RemoteClassifier, RemoteIntent};
pub use suggest::{suggest, SUGGESTIONS};

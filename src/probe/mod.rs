//! Stream probing: candidate generation and verification

pub mod candidate;
pub mod verifier;

pub use candidate::{credential_variants, normalize_path, CandidateGenerator, CredentialVariant, StreamCandidate};
pub use verifier::{FfmpegProbe, MediaProbe, StreamVerifier, VerificationOutcome, VerificationState};

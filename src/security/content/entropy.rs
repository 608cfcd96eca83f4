use serde::Serialize;

/// Prefix length inspected when judging whether content looks random.
pub const ENTROPY_SAMPLE_BYTES: usize = 1024;

/// At or above this many bits per byte content is reported as likely
/// encrypted or random.
pub const HIGH_ENTROPY_THRESHOLD: f64 = 7.5;

/// Shannon entropy in bits per byte, within `[0, 8]`. Empty input is `0`.
#[must_use]
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[usize::from(byte)] += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let total = data.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    // A single-symbol buffer sums to -0.0
    entropy.clamp(0.0, 8.0).abs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntropyAssessment {
    Structured,
    Mixed,
    LikelyCompressed,
    LikelyEncrypted,
}

impl EntropyAssessment {
    #[must_use]
    pub fn from_entropy(entropy: f64) -> Self {
        if entropy < 3.0 {
            Self::Structured
        } else if entropy < 6.0 {
            Self::Mixed
        } else if entropy < HIGH_ENTROPY_THRESHOLD {
            Self::LikelyCompressed
        } else {
            Self::LikelyEncrypted
        }
    }
}

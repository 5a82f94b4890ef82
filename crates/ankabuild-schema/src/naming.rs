use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Characters used for generated name suffixes.
pub const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of every generated suffix and rule name.
pub const RANDOM_SUFFIX_LEN: usize = 10;

const VM_NAME_PREFIX: &str = "anka-packer-";
const BASE_VM_NAME_PREFIX: &str = "anka-disk-base-";

/// Source of auto-generated names.
///
/// Names only need a low collision probability within one run, so a seeded
/// `StdRng` is enough. Tests construct it with [`NameGenerator::seeded`] to get
/// reproducible output.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    rng: StdRng,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::from_time()
    }
}

impl NameGenerator {
    /// Seed from the current wall-clock time.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::seeded(nanos)
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn random_sequence(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(NAME_ALPHABET[self.rng.random_range(0..NAME_ALPHABET.len())]))
            .collect()
    }

    /// A fresh `RANDOM_SUFFIX_LEN`-character identifier.
    pub fn suffix(&mut self) -> String {
        self.random_sequence(RANDOM_SUFFIX_LEN)
    }

    /// Name for the build VM when the template leaves `vm_name` blank.
    pub fn vm_name(&mut self) -> String {
        format!("{VM_NAME_PREFIX}{}", self.suffix())
    }

    /// Name for the intermediate VM wrapping a freshly installed disk.
    pub fn base_vm_name(&mut self) -> String {
        format!("{BASE_VM_NAME_PREFIX}{}", self.suffix())
    }
}

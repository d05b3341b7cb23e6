use rand::Rng;

pub const RANDOM_ID_MIN: i64 = 1_000_000_000;
pub const RANDOM_ID_MAX: i64 = 9_999_999_999;

/// How a new certificate gets its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Client-drawn 10-digit number, used by the self-service form. There is
    /// no collision check; a duplicate surfaces as a store rejection.
    Random,
    /// Id omitted on insert and assigned by the store.
    Sequential,
}

impl IdPolicy {
    pub fn assign(&self) -> Option<i64> {
        match self {
            IdPolicy::Random => Some(generate_random_id()),
            IdPolicy::Sequential => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IdPolicy::Random => "random",
            IdPolicy::Sequential => "sequential",
        }
    }
}

pub fn generate_random_id() -> i64 {
    rand::thread_rng().gen_range(RANDOM_ID_MIN..=RANDOM_ID_MAX)
}

/// Parses an id taken from a path or query string. Anything that is not a
/// positive integer yields `None`.
pub fn parse_certificate_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

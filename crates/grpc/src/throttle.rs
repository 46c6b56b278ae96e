//! Aggregate bandwidth throttle for network transfers.
//!
//! One [`ByteBlockChecker`] is shared by every network transport the
//! composition root builds, so the ceiling applies to the process as a whole
//! rather than to each worker connection.
//!
//! ## Algorithm
//!
//! Transfers report their byte count after they complete. Counts accumulate
//! until they reach the check block size; only then is the elapsed wall-clock
//! time since the previous check compared with the time the accumulated bytes
//! should have taken at the ceiling:
//!
//! ```text
//! expected_micros = total_bytes * 8 / (ceiling_bps / 1_000_000)
//! ```
//!
//! If the bytes arrived faster than that, the reporting caller sleeps the
//! difference. The total and the check timestamp are reset after every check.
//! Transfers are never paced while in flight: a single large transfer is paid
//! for afterwards, delaying the caller's next request.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;
use transfer::BandwidthCeiling;

/// Bytes accumulated between two checks when no block size is given.
pub const DEFAULT_CHECK_BLOCK_SIZE: u64 = 1 << 20;

/// Sleeps callers whose combined transfers exceed a bandwidth ceiling.
#[derive(Debug)]
pub struct ByteBlockChecker {
    ceiling: BandwidthCeiling,
    check_block_size: u64,
    // Held across the enforced sleep, so concurrent reporters queue behind it.
    state: Mutex<BlockState>,
}

#[derive(Debug)]
struct BlockState {
    pending_bytes: u64,
    last_check: Instant,
}

impl ByteBlockChecker {
    /// Creates a checker using [`DEFAULT_CHECK_BLOCK_SIZE`].
    pub fn new(ceiling: BandwidthCeiling) -> Self {
        Self::with_check_block_size(ceiling, DEFAULT_CHECK_BLOCK_SIZE)
    }

    /// Creates a checker that evaluates the ceiling every `check_block_size`
    /// bytes (at least one).
    pub fn with_check_block_size(ceiling: BandwidthCeiling, check_block_size: u64) -> Self {
        Self {
            ceiling,
            check_block_size: check_block_size.max(1),
            state: Mutex::new(BlockState {
                pending_bytes: 0,
                last_check: Instant::now(),
            }),
        }
    }

    pub fn ceiling(&self) -> BandwidthCeiling {
        self.ceiling
    }

    pub fn check_block_size(&self) -> u64 {
        self.check_block_size
    }

    /// Records `bytes` transferred and, once a full block has accumulated,
    /// sleeps for as long as the ceiling requires.
    ///
    /// Returns how long the caller was made to sleep.
    pub async fn add_and_sleep_check(&self, bytes: u64) -> Duration {
        let mut state = self.state.lock().await;
        state.pending_bytes = state.pending_bytes.saturating_add(bytes);
        if state.pending_bytes < self.check_block_size {
            return Duration::ZERO;
        }

        let expected = self.expected_transfer_time(state.pending_bytes);
        let elapsed = state.last_check.elapsed();
        let mut slept = Duration::ZERO;
        if expected > elapsed {
            slept = expected - elapsed;
            trace!(
                bytes = state.pending_bytes,
                sleep_micros = slept.as_micros() as u64,
                "bandwidth ceiling reached"
            );
            tokio::time::sleep(slept).await;
        }
        state.pending_bytes = 0;
        state.last_check = Instant::now();
        slept
    }

    /// Time `bytes` should take to transfer at the ceiling.
    pub fn expected_transfer_time(&self, bytes: u64) -> Duration {
        let bits_per_micro = self.ceiling.bits_per_second() as f64 / 1_000_000.0;
        let micros = bytes as f64 * 8.0 / bits_per_micro;
        Duration::from_micros(micros as u64)
    }

    /// Bytes reported since the last check.
    pub async fn pending_bytes(&self) -> u64 {
        self.state.lock().await.pending_bytes
    }
}

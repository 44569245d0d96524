//! # Orientation sensor interface
//!
//! The orientation sensor (a gyro or AHRS) gives an absolute heading when it
//! is connected. It is shared between the control cycle, which reads it, and
//! a one-shot warm-up thread, which resets it once after startup, so drivers
//! must be safe to call from both.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use util::maths;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An absolute orientation sensor.
pub trait OrientationSensor: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Raw yaw reading. May be unbounded and in either sense, see
    /// [`sensor_heading_rad`].
    ///
    /// Units: degrees
    fn heading_deg(&self) -> f64;

    /// Zero the sensor's yaw.
    fn reset(&self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stands in for a sensor which is not fitted. Never connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOrientationSensor;

/// Progress of the warm-up reset, shared between the warm-up thread and the
/// pose estimator.
///
/// The stage moves to `Resetting` before the sensor is told to reset, so a
/// reader which sees `Waiting` both before and after a reading knows the
/// reading was taken before the reset.
#[derive(Debug, Default)]
pub struct WarmupStatus(AtomicU8);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupStage {
    Waiting = 0,
    Resetting = 1,
    Done = 2
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OrientationSensor for NoOrientationSensor {
    fn is_connected(&self) -> bool {
        false
    }

    fn heading_deg(&self) -> f64 {
        0.0
    }

    fn reset(&self) {}
}

impl WarmupStatus {
    pub fn stage(&self) -> WarmupStage {
        match self.0.load(Ordering::SeqCst) {
            0 => WarmupStage::Waiting,
            1 => WarmupStage::Resetting,
            _ => WarmupStage::Done
        }
    }

    pub(crate) fn set(&self, stage: WarmupStage) {
        self.0.store(stage as u8, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a raw sensor reading into a counter-clockwise positive heading in
/// `[-pi, pi]`.
pub fn sensor_heading_rad(raw_deg: f64, clockwise_positive: bool) -> f64 {
    let wrapped_deg = maths::ieee_remainder(raw_deg, 360.0);

    if clockwise_positive {
        (-wrapped_deg).to_radians()
    }
    else {
        wrapped_deg.to_radians()
    }
}

/// Reset the sensor once after `delay` on a background thread.
///
/// Some sensors calibrate for a while after power on and report a drifting
/// yaw until they are reset. The thread touches nothing but the sensor and
/// `status`, which it moves through the warm-up stages.
pub fn spawn_warmup_reset(
    sensor: Arc<dyn OrientationSensor>, 
    delay: Duration,
    status: Arc<WarmupStatus>
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        status.set(WarmupStage::Resetting);
        sensor.reset();
        status.set(WarmupStage::Done);
        info!("Orientation sensor reset after {:.1} s warm-up", delay.as_secs_f64());
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records the warm-up stage seen from inside `reset`.
    #[derive(Default)]
    struct ResetFlag {
        reset: AtomicBool,
        status: Arc<WarmupStatus>
    }

    impl OrientationSensor for ResetFlag {
        fn is_connected(&self) -> bool {
            true
        }
        fn heading_deg(&self) -> f64 {
            0.0
        }
        fn reset(&self) {
            assert_eq!(self.status.stage(), WarmupStage::Resetting);
            self.reset.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_sensor_heading() {
        assert!((sensor_heading_rad(90.0, false) - 90f64.to_radians()).abs() < 1e-12);
        assert!((sensor_heading_rad(90.0, true) + 90f64.to_radians()).abs() < 1e-12);
        assert!((sensor_heading_rad(370.0, true) + 10f64.to_radians()).abs() < 1e-12);
        assert!((sensor_heading_rad(-725.0, false) + 5f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_warmup_reset() {
        let flag = Arc::new(ResetFlag::default());
        assert_eq!(flag.status.stage(), WarmupStage::Waiting);

        let handle = spawn_warmup_reset(
            flag.clone(), Duration::from_millis(5), flag.status.clone()
        );
        handle.join().unwrap();

        assert!(flag.reset.load(Ordering::SeqCst));
        assert_eq!(flag.status.stage(), WarmupStage::Done);
    }
}

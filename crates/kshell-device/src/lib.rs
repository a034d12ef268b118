//! Mutable device state shared by every session.
//!
//! Pure data plus mutators; no I/O. Validation does not happen here: the
//! protocol parser rejects out-of-range aliases, delays and outlet numbers
//! before they reach this crate. [`DeviceHandle`] is the synchronized view
//! every session goes through; raw [`Device`] access is for construction
//! and tests.

use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::NaiveTime;
use parking_lot::Mutex;

/// Number of switchable outlets.
pub const OUTLET_COUNT: usize = 4;

/// Firmware version reported by `version`.
pub const FIRMWARE_VERSION: &str = "2.33";

// ============================================================================
// Outlet records
// ============================================================================

/// Repeat policy of an outlet timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// Fire once at the configured times.
    #[default]
    Once,
    /// Fire every day.
    Daily,
    /// Fire on the days selected in the week mask.
    Weekly,
}

/// Timer configuration attached to each outlet.
///
/// Carried as data only: the protocol reports whether the timer is enabled
/// (the `timer`/`manual` mode in `port setup`), but nothing here drives
/// switching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletTimer {
    /// Whether the timer drives this outlet.
    pub enabled: bool,
    /// Repeat policy.
    pub mode: TimerMode,
    /// Time of day to switch on.
    pub switch_on: Option<NaiveTime>,
    /// Time of day to switch off.
    pub switch_off: Option<NaiveTime>,
    /// Weekday mask for [`TimerMode::Weekly`], Monday first.
    pub week_days: [bool; 7],
}

impl Default for OutletTimer {
    fn default() -> Self {
        OutletTimer {
            enabled: false,
            mode: TimerMode::Once,
            switch_on: None,
            switch_off: None,
            week_days: [true; 7],
        }
    }
}

/// Watchdog configuration attached to each outlet. Data only, like the
/// timer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletWatchdog {
    /// Whether the watchdog monitors this outlet.
    pub enabled: bool,
    /// Address pinged by the watchdog.
    pub ip: Ipv4Addr,
    /// Seconds without a pong before the outlet is power-cycled.
    pub timeout_secs: u16,
    /// Seconds to wait after power-up before monitoring resumes.
    pub power_on_delay_secs: u16,
    /// Seconds between pings.
    pub ping_interval_secs: u16,
    /// Power-cycle attempts before giving up.
    pub max_retries: u8,
    /// Leave the outlet off once retries are exhausted.
    pub power_off_when_retries_exhausted: bool,
    /// Send a notification email on watchdog action.
    pub send_email: bool,
}

impl Default for OutletWatchdog {
    fn default() -> Self {
        OutletWatchdog {
            enabled: false,
            ip: Ipv4Addr::UNSPECIFIED,
            timeout_secs: 9,
            power_on_delay_secs: 60,
            ping_interval_secs: 3,
            max_retries: 3,
            power_off_when_retries_exhausted: false,
            send_email: false,
        }
    }
}

/// One switchable power socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlet {
    /// Current switch state.
    pub power_status: bool,
    /// State restored after device power-up.
    pub power_status_after_power_on: bool,
    /// Configured outlet name.
    pub name: String,
    /// Off time, in seconds, of a power-cycle interrupt.
    pub interrupt_delay: u16,
    /// Timer configuration.
    pub timer: OutletTimer,
    /// Watchdog configuration.
    pub watchdog: OutletWatchdog,
}

impl Default for Outlet {
    fn default() -> Self {
        Outlet {
            power_status: false,
            power_status_after_power_on: false,
            name: "outlet x".to_string(),
            interrupt_delay: 5,
            timer: OutletTimer::default(),
            watchdog: OutletWatchdog::default(),
        }
    }
}

/// Point-in-time outlet summary, the payload source for `port setup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletSnapshot {
    /// Configured outlet name.
    pub name: String,
    /// Whether the outlet is timer-driven.
    pub timer_enabled: bool,
    /// Off time, in seconds, of a power-cycle interrupt.
    pub interrupt_delay: u16,
    /// State restored after device power-up.
    pub power_on_state: bool,
}

// ============================================================================
// Device
// ============================================================================

/// Full device state: identity settings plus the four outlets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    alias: String,
    version: String,
    swdelay: u16,
    discover: bool,
    outlets: [Outlet; OUTLET_COUNT],
}

impl Default for Device {
    /// Factory state: alias "Zarathustra", discovery on, switch delay 15,
    /// every outlet off.
    fn default() -> Self {
        Device {
            alias: "Zarathustra".to_string(),
            version: FIRMWARE_VERSION.to_string(),
            swdelay: 15,
            discover: true,
            outlets: Default::default(),
        }
    }
}

impl Device {
    /// Device alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Replace the alias. Length was validated at the protocol boundary.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    /// Firmware version. There is no setter; the version is fixed.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Switch delay setting.
    pub fn swdelay(&self) -> u16 {
        self.swdelay
    }

    /// Replace the switch delay. Range was validated at the protocol
    /// boundary.
    pub fn set_swdelay(&mut self, delay: u16) {
        self.swdelay = delay;
    }

    /// Whether discovery answers are enabled.
    pub fn discover(&self) -> bool {
        self.discover
    }

    /// Enable or disable discovery answers.
    pub fn set_discover(&mut self, enable: bool) {
        self.discover = enable;
    }

    /// All outlet switch states, outlet 1 first.
    pub fn outlet_states(&self) -> [bool; OUTLET_COUNT] {
        let mut states = [false; OUTLET_COUNT];
        for (state, outlet) in states.iter_mut().zip(self.outlets.iter()) {
            *state = outlet.power_status;
        }
        states
    }

    /// Switch one outlet. `index` is 0-based and was validated at the
    /// protocol boundary.
    pub fn set_outlet(&mut self, index: usize, on: bool) {
        self.outlets[index].power_status = on;
    }

    /// Borrow one outlet record. `index` is 0-based.
    pub fn outlet(&self, index: usize) -> &Outlet {
        &self.outlets[index]
    }

    /// Mutably borrow one outlet record. `index` is 0-based.
    pub fn outlet_mut(&mut self, index: usize) -> &mut Outlet {
        &mut self.outlets[index]
    }

    /// Summarize one outlet for a `port setup` reply. `index` is 0-based.
    pub fn outlet_snapshot(&self, index: usize) -> OutletSnapshot {
        let outlet = &self.outlets[index];
        OutletSnapshot {
            name: outlet.name.clone(),
            timer_enabled: outlet.timer.enabled,
            interrupt_delay: outlet.interrupt_delay,
            power_on_state: outlet.power_status_after_power_on,
        }
    }
}

// ============================================================================
// Shared handle
// ============================================================================

/// Cloneable, synchronized view of one shared [`Device`].
///
/// Sessions run on separate tasks but mutate the same device; every access
/// goes through this handle so reads observe completed writes and no update
/// is lost. The lock is held only for the duration of one accessor, never
/// across I/O.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    inner: Arc<Mutex<Device>>,
}

impl DeviceHandle {
    /// Wrap a device for sharing across sessions.
    pub fn new(device: Device) -> Self {
        DeviceHandle {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Device alias.
    pub fn alias(&self) -> String {
        self.inner.lock().alias.clone()
    }

    /// Replace the alias.
    pub fn set_alias(&self, alias: impl Into<String>) {
        self.inner.lock().set_alias(alias);
    }

    /// Firmware version.
    pub fn version(&self) -> String {
        self.inner.lock().version.clone()
    }

    /// Whether discovery answers are enabled.
    pub fn discover(&self) -> bool {
        self.inner.lock().discover
    }

    /// Enable or disable discovery answers.
    pub fn set_discover(&self, enable: bool) {
        self.inner.lock().set_discover(enable);
    }

    /// Switch delay setting.
    pub fn swdelay(&self) -> u16 {
        self.inner.lock().swdelay
    }

    /// Replace the switch delay.
    pub fn set_swdelay(&self, delay: u16) {
        self.inner.lock().set_swdelay(delay);
    }

    /// All outlet switch states, outlet 1 first.
    pub fn outlet_states(&self) -> [bool; OUTLET_COUNT] {
        self.inner.lock().outlet_states()
    }

    /// Switch one outlet. `index` is 0-based.
    pub fn set_outlet(&self, index: usize, on: bool) {
        self.inner.lock().set_outlet(index, on);
    }

    /// Summarize one outlet for a `port setup` reply. `index` is 0-based.
    pub fn outlet_snapshot(&self, index: usize) -> OutletSnapshot {
        self.inner.lock().outlet_snapshot(index)
    }

    /// Run a closure against the locked device. For construction-time
    /// adjustments and tests; sessions use the named accessors.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut Device) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

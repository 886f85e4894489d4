//! Engine configuration.
//!
//! [`Config::default`] gives the stock timings; [`Config::from_env`] layers
//! `SPARK_*` environment overrides on top.

use std::time::Duration;

/// Runtime knobs for the host loop and the event manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Delay before the first synthesized mouse-down while the left button is held.
    pub auto_repeat_delay: Duration,
    /// Period between synthesized mouse-downs after the first one.
    pub auto_repeat_interval: Duration,
    /// Ask the terminal for mouse reporting.
    pub mouse_capture: bool,
    /// Run inside the alternate screen.
    pub alternate_screen: bool,
    /// Repaint the whole canvas after a terminal resize.
    pub force_repaint_on_resize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_repeat_delay: Duration::from_millis(300),
            auto_repeat_interval: Duration::from_millis(100),
            mouse_capture: true,
            alternate_screen: true,
            force_repaint_on_resize: true,
        }
    }
}

impl Config {
    pub const ENV_AUTO_REPEAT_DELAY: &'static str = "SPARK_AUTO_REPEAT_DELAY_MS";
    pub const ENV_AUTO_REPEAT_INTERVAL: &'static str = "SPARK_AUTO_REPEAT_INTERVAL_MS";
    pub const ENV_MOUSE: &'static str = "SPARK_MOUSE";

    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str| lookup(key).and_then(|v| parse_millis(key, &v));
        if let Some(ms) = millis(Self::ENV_AUTO_REPEAT_DELAY) {
            self.auto_repeat_delay = ms;
        }
        if let Some(ms) = millis(Self::ENV_AUTO_REPEAT_INTERVAL) {
            self.auto_repeat_interval = ms;
        }
        if let Some(value) = lookup(Self::ENV_MOUSE) {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => self.mouse_capture = true,
                "0" | "false" | "off" | "no" => self.mouse_capture = false,
                other => log::warn!("ignoring {}={other:?}: expected on/off", Self::ENV_MOUSE),
            }
        }
        self
    }
}

fn parse_millis(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            log::warn!("ignoring {key}={value:?}: {err}");
            None
        }
    }
}

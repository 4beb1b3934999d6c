//! Tracker - producer facade over the delivery queue.
//!
//! Turns `log(event, revenue, arguments)` calls into `UserLogTask`s,
//! applying the collector's input limits (with warnings) on the way in.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::domain::wire::{UNIT_SEPARATOR, truncate_chars};
use crate::domain::{UserData, UserLogTask, UserUpdateTask};
use crate::ports::Clock;
use crate::queue::DeliveryQueue;

/// Event name + arguments may not exceed this many characters.
pub const MAX_EVENT_LEN: usize = 200;

/// Revenue is capped to ±this value.
pub const MAX_REVENUE: f64 = 999_999.99;

pub const LAUNCH_EVENT: &str = "launch";

pub struct Tracker {
    queue: DeliveryQueue,
    clock: Arc<dyn Clock>,
    user: UserData,
    ab_letters: RwLock<Option<String>>,
    send_launch_event: bool,
}

impl Tracker {
    pub fn new(
        queue: DeliveryQueue,
        clock: Arc<dyn Clock>,
        user: UserData,
        send_launch_event: bool,
    ) -> Self {
        Self {
            queue,
            clock,
            user,
            ab_letters: RwLock::new(None),
            send_launch_event,
        }
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub fn user(&self) -> &UserData {
        &self.user
    }

    /// Variant letters attached to subsequent combined uploads.
    pub fn set_ab_letters(&self, letters: impl Into<String>) {
        let mut guard = self.ab_letters.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(letters.into());
    }

    fn ab_letters(&self) -> Option<String> {
        self.ab_letters
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Log an event with key/value arguments (sent sorted by key).
    pub async fn log(&self, event: &str, revenue: f64, arguments: &BTreeMap<String, String>) {
        if event == LAUNCH_EVENT && self.send_launch_event {
            warn!("the launch event is sent automatically on startup and should not be logged manually");
        }
        self.log_raw(event, revenue, &join_arguments(arguments)).await;
    }

    /// Log an event whose arguments are already unit-separated.
    pub async fn log_raw(&self, event: &str, revenue: f64, added_arguments: &str) {
        let (event, added_arguments) = clamp_event(event, added_arguments);
        let task = UserLogTask {
            app_id: self.user.app_id.clone(),
            user_data: self.user.to_wire(),
            event,
            revenue: format_revenue(revenue),
            added_arguments,
            time: self.clock.now(),
            ab_letters: self.ab_letters(),
        };
        self.queue.enqueue(task).await;
    }

    pub async fn send_user_update(&self) {
        let task = UserUpdateTask::from_user(&self.user, self.clock.now());
        self.queue.enqueue(task).await;
    }

    /// Startup hook: profile update, then the launch event if enabled.
    pub async fn launch(&self) {
        self.send_user_update().await;
        if self.send_launch_event {
            self.log_raw(LAUNCH_EVENT, 0.0, "").await;
        }
    }
}

/// `key US value US key US value`, with separators stripped from the parts.
pub fn join_arguments(arguments: &BTreeMap<String, String>) -> String {
    let strip = |s: &str| s.replace(UNIT_SEPARATOR, "");
    arguments
        .iter()
        .flat_map(|(k, v)| [strip(k), strip(v)])
        .collect::<Vec<_>>()
        .join(&UNIT_SEPARATOR.to_string())
}

/// Enforce `event + arguments <= MAX_EVENT_LEN` characters.
pub fn clamp_event(event: &str, arguments: &str) -> (String, String) {
    let event_len = event.chars().count();
    if event_len > MAX_EVENT_LEN {
        warn!("event name is longer than {MAX_EVENT_LEN} characters and will be truncated");
    }
    let event = truncate_chars(event, MAX_EVENT_LEN);
    warn_on_control_chars("event name", &event);

    let event_len = event.chars().count();
    let arguments = if event_len >= MAX_EVENT_LEN {
        if !arguments.is_empty() {
            warn!("added arguments are ignored because the event name uses the whole length budget");
        }
        String::new()
    } else {
        if event_len + arguments.chars().count() > MAX_EVENT_LEN {
            warn!("event name + arguments exceed {MAX_EVENT_LEN} characters; arguments will be truncated");
        }
        truncate_chars(arguments, MAX_EVENT_LEN - event_len)
    };
    warn_on_control_chars("added arguments", &arguments);

    (event, arguments)
}

fn warn_on_control_chars(what: &str, value: &str) {
    if value.contains('\t') {
        warn!(field = what, "contains tab characters; the collector replaces them with spaces");
    }
    if value.contains('\n') {
        warn!(field = what, "contains new line characters; the collector replaces them with spaces");
    }
    if value.contains('\r') {
        warn!(field = what, "contains carriage returns; the collector removes them");
    }
}

/// Two decimals, capped to ±`MAX_REVENUE`, with a `.00` suffix dropped.
pub fn format_revenue(value: f64) -> String {
    let value = if value > MAX_REVENUE {
        warn!(value, "revenue exceeds the maximum of 999,999.99 and will be capped");
        MAX_REVENUE
    } else if value < -MAX_REVENUE {
        warn!(value, "revenue is below the minimum of -999,999.99 and will be capped");
        -MAX_REVENUE
    } else if value.is_nan() {
        warn!("revenue is not a number and will be sent as 0");
        0.0
    } else {
        value
    };
    if (value * 100.0).fract().abs() > f64::EPSILON {
        warn!(value, "revenue has sub-cent digits which will be rounded");
    }
    // `-0.0` would otherwise print as "-0".
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.2}").replace(".00", "")
}

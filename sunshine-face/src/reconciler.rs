//! Weather data reconciler
//!
//! The paired handheld publishes path-addressed data items. Items on
//! [`WEATHER_PATH`] carry a loosely typed map:
//!
//! ```json
//! {"path": "/sunshine-weather", "data": {"weather_id": 800, "low": 5.4, "high": 21.6}}
//! ```
//!
//! Every field is optional. A missing or malformed field keeps the value of
//! the current snapshot, so a partial update never resets the display.

use alloc::{collections::BTreeMap, string::String};

use embassy_sync::blocking_mutex::raw::RawMutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    engine::LinkCommand,
    error::{LinkError, PayloadError},
    fmt::{debug, info, trace, warn},
    weather::{WeatherCell, WeatherSnapshot},
};

/// Resource path of weather items
pub const WEATHER_PATH: &str = "/sunshine-weather";

/// Largest encoded data item accepted
pub const MAX_ITEM_LEN: usize = 256;

const KEY_WEATHER_ID: &str = "weather_id";
const KEY_LOW: &str = "low";
const KEY_HIGH: &str = "high";

/// A path-addressed key/value map published by the handheld
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub path: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl DataItem {
    pub fn new(path: &str, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Decode the JSON wire form
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.len() > MAX_ITEM_LEN {
            return Err(PayloadError::TooLarge);
        }
        serde_json::from_slice(bytes).map_err(|_| PayloadError::Malformed)
    }

    pub fn is_weather(&self) -> bool {
        self.path == WEATHER_PATH
    }
}

/// Outcome of reading one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Missing,
    /// Present but not a usable number
    Malformed,
    Value(i32),
}

impl Field {
    /// The field's value, or `previous` when absent or unusable
    pub fn or(self, previous: i32) -> i32 {
        match self {
            Field::Value(value) => value,
            Field::Missing | Field::Malformed => previous,
        }
    }

    fn integer(data: &Map<String, Value>, key: &str) -> Self {
        match data.get(key) {
            None => Field::Missing,
            Some(value) => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map_or(Field::Malformed, Field::Value),
        }
    }

    fn rounded(data: &Map<String, Value>, key: &str) -> Self {
        match data.get(key) {
            None => Field::Missing,
            Some(value) => value
                .as_f64()
                .and_then(round_half_up)
                .map_or(Field::Malformed, Field::Value),
        }
    }
}

/// Round to the nearest integer, halves towards positive infinity
pub fn round_half_up(value: f64) -> Option<i32> {
    if !value.is_finite() {
        return None;
    }
    let rounded = libm::floor(value + 0.5);
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return None;
    }
    Some(rounded as i32)
}

/// Weather fields of a data item
///
/// `high` is read as a number and rounded, like `low`, even when the
/// handheld sends it as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WeatherFields {
    pub weather_id: Field,
    pub low: Field,
    pub high: Field,
}

impl WeatherFields {
    pub fn read(data: &Map<String, Value>) -> Self {
        Self {
            weather_id: Field::integer(data, KEY_WEATHER_ID),
            low: Field::rounded(data, KEY_LOW),
            high: Field::rounded(data, KEY_HIGH),
        }
    }

    /// Merge onto `previous`, field by field
    pub fn merge(&self, previous: &WeatherSnapshot) -> WeatherSnapshot {
        WeatherSnapshot::new(
            self.high.or(previous.high),
            self.low.or(previous.low),
            self.weather_id.or(previous.condition),
        )
    }
}

/// Log the weather fields of an item as they arrive
///
/// Runs for every item the handheld writes, whether or not the face is
/// subscribed.
pub fn log_item(item: &DataItem) {
    if !item.is_weather() {
        return;
    }
    let fields = WeatherFields::read(&item.data);
    for (key, field) in [
        (KEY_WEATHER_ID, fields.weather_id),
        (KEY_LOW, fields.low),
        (KEY_HIGH, fields.high),
    ] {
        match field {
            Field::Value(value) => debug!("Received {}: {}", key, value),
            Field::Malformed => warn!("Received malformed {}", key),
            Field::Missing => {}
        }
    }
}

/// The handheld's data layer as seen from the watch
///
/// Keeps the latest item per path whether or not anyone listens, so a
/// subscriber can catch up on what changed while it was away.
#[derive(Debug, Default)]
pub struct DataFeed {
    items: BTreeMap<String, DataItem>,
    peer: bool,
    subscribed: bool,
    /// The face asked for a connection and has not dropped it since
    wanted: bool,
}

impl DataFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether a handheld is connected
    ///
    /// Losing the handheld ends the subscription.
    pub fn set_peer(&mut self, connected: bool) {
        if self.peer != connected {
            info!("Handheld {}", if connected { "connected" } else { "disconnected" });
        }
        self.peer = connected;
        if !connected {
            self.subscribed = false;
        }
    }

    pub fn has_peer(&self) -> bool {
        self.peer
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Whether the face currently wants to be subscribed
    pub fn is_wanted(&self) -> bool {
        self.wanted
    }

    /// Start receiving the change feed
    pub fn subscribe(&mut self) -> Result<(), LinkError> {
        if !self.peer {
            return Err(LinkError::NoPeer);
        }
        self.subscribed = true;
        Ok(())
    }

    pub fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    /// Store an item, handing it back if it should be delivered
    pub fn publish(&mut self, item: DataItem) -> Option<&DataItem> {
        let path = item.path.clone();
        self.items.insert(path.clone(), item);
        if self.subscribed {
            self.items.get(&path)
        } else {
            None
        }
    }

    /// Latest item of every path
    pub fn items(&self) -> impl Iterator<Item = &DataItem> {
        self.items.values()
    }
}

/// Applies weather items to the shared snapshot
pub struct Reconciler<'a, M: RawMutex> {
    weather: &'a WeatherCell<M>,
}

impl<'a, M: RawMutex> Reconciler<'a, M> {
    pub fn new(weather: &'a WeatherCell<M>) -> Self {
        Self { weather }
    }

    /// Apply one item
    ///
    /// Items on other paths are ignored. Returns the new snapshot when it
    /// was swapped in, so the caller can trigger a redraw.
    pub fn apply(&self, item: &DataItem) -> Option<WeatherSnapshot> {
        if !item.is_weather() {
            trace!("Ignoring data item outside the weather path");
            return None;
        }

        let fields = WeatherFields::read(&item.data);
        for (key, field) in [
            (KEY_WEATHER_ID, fields.weather_id),
            (KEY_LOW, fields.low),
            (KEY_HIGH, fields.high),
        ] {
            if field == Field::Malformed {
                warn!("Malformed weather field {}, keeping previous value", key);
            }
        }

        let snapshot = fields.merge(&self.weather.get());
        self.weather.replace(snapshot);
        info!(
            "Weather updated: {} high {} low {}",
            snapshot.condition, snapshot.high, snapshot.low
        );
        Some(snapshot)
    }

    /// Follow a connect or disconnect request from the engine
    ///
    /// Connecting pulls every stored item once. A failed connection is
    /// logged and leaves the snapshot as is until the handheld shows up or
    /// the next attempt.
    pub fn on_link(&self, feed: &mut DataFeed, command: LinkCommand) -> Option<WeatherSnapshot> {
        match command {
            LinkCommand::Connect => {
                feed.wanted = true;
                self.connect(feed)
            }
            LinkCommand::Disconnect => {
                feed.wanted = false;
                if feed.is_subscribed() {
                    info!("Unsubscribed from data layer");
                }
                feed.unsubscribe();
                None
            }
        }
    }

    /// Follow the handheld coming and going
    ///
    /// A handheld that connects while the face wants the link completes the
    /// pending connection.
    pub fn on_peer(&self, feed: &mut DataFeed, connected: bool) -> Option<WeatherSnapshot> {
        feed.set_peer(connected);
        if connected && feed.wanted && !feed.is_subscribed() {
            self.connect(feed)
        } else {
            None
        }
    }

    fn connect(&self, feed: &mut DataFeed) -> Option<WeatherSnapshot> {
        match feed.subscribe() {
            Ok(()) => {
                info!("Subscribed to data layer");
                feed.items().filter_map(|item| self.apply(item)).last()
            }
            Err(err) => {
                warn!("Data layer unavailable: {}", err);
                None
            }
        }
    }

    /// Store an incoming item and apply it if the face is subscribed
    pub fn on_published(&self, feed: &mut DataFeed, item: DataItem) -> Option<WeatherSnapshot> {
        let delivered = feed.publish(item)?;
        self.apply(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use serde_json::json;

    fn item(data: Value) -> DataItem {
        match data {
            Value::Object(map) => DataItem::new(WEATHER_PATH, map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(5.4), Some(5));
        assert_eq!(round_half_up(21.6), Some(22));
        assert_eq!(round_half_up(2.5), Some(3));
        assert_eq!(round_half_up(-2.5), Some(-2));
        assert_eq!(round_half_up(-2.6), Some(-3));
        assert_eq!(round_half_up(f64::NAN), None);
        assert_eq!(round_half_up(f64::INFINITY), None);
        assert_eq!(round_half_up(1e12), None);
    }

    #[test]
    fn test_full_payload() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);

        let snapshot = reconciler
            .apply(&item(json!({"weather_id": 800, "low": 5.4, "high": 21.6})))
            .unwrap();

        assert_eq!(snapshot.condition, 800);
        assert_eq!(snapshot.low, 5);
        assert_eq!(snapshot.high, 22);
        assert_eq!(cell.get(), snapshot);
    }

    #[test]
    fn test_missing_fields_keep_previous_values() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);
        reconciler.apply(&item(json!({"weather_id": 500, "low": 5.4, "high": 21.6})));

        let snapshot = reconciler.apply(&item(json!({"weather_id": 800}))).unwrap();
        assert_eq!((snapshot.condition, snapshot.low, snapshot.high), (800, 5, 22));
    }

    #[test]
    fn test_first_update_starts_from_placeholder() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);

        let snapshot = reconciler.apply(&item(json!({"high": 30}))).unwrap();
        assert_eq!((snapshot.condition, snapshot.low, snapshot.high), (800, 0, 30));
    }

    #[test]
    fn test_malformed_fields_fall_back() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::new(WeatherSnapshot::new(20, 10, 500));
        let reconciler = Reconciler::new(&cell);

        let snapshot = reconciler
            .apply(&item(json!({
                "weather_id": "rain",
                "low": null,
                "high": 1e40,
                "humidity": 80
            })))
            .unwrap();
        assert_eq!(snapshot, WeatherSnapshot::new(20, 10, 500));

        let fields = WeatherFields::read(&item(json!({"weather_id": 800.5})).data);
        assert_eq!(fields.weather_id, Field::Malformed);
        assert_eq!(fields.low, Field::Missing);
    }

    #[test]
    fn test_integer_high_is_accepted() {
        let fields = WeatherFields::read(&item(json!({"high": 21, "low": -3})).data);
        assert_eq!(fields.high, Field::Value(21));
        assert_eq!(fields.low, Field::Value(-3));
    }

    #[test]
    fn test_other_paths_are_ignored() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);

        let mut other = item(json!({"weather_id": 200}));
        other.path = "/sunshine-forecast".into();
        assert_eq!(reconciler.apply(&other), None);
        assert_eq!(cell.get(), WeatherSnapshot::placeholder());
    }

    #[test]
    fn test_decode_wire_form() {
        let bytes = br#"{"path":"/sunshine-weather","data":{"weather_id":801,"low":5.4,"high":21.6}}"#;
        let item = DataItem::from_slice(bytes).unwrap();
        assert!(item.is_weather());
        assert_eq!(item.data.len(), 3);

        let bare = DataItem::from_slice(br#"{"path":"/sunshine-weather"}"#).unwrap();
        assert!(bare.data.is_empty());

        assert_eq!(DataItem::from_slice(b"{\"data\":{}}"), Err(PayloadError::Malformed));
        assert_eq!(DataItem::from_slice(b"not json"), Err(PayloadError::Malformed));
        assert_eq!(
            DataItem::from_slice(&[b' '; MAX_ITEM_LEN + 1]),
            Err(PayloadError::TooLarge)
        );
    }

    #[test]
    fn test_feed_delivers_only_while_subscribed() {
        let mut feed = DataFeed::new();
        assert_eq!(feed.subscribe(), Err(LinkError::NoPeer));

        feed.set_peer(true);
        assert!(feed.publish(item(json!({"high": 1}))).is_none());
        assert_eq!(feed.items().count(), 1);

        feed.subscribe().unwrap();
        assert!(feed.publish(item(json!({"high": 2}))).is_some());
        // Latest item per path only
        assert_eq!(feed.items().count(), 1);

        feed.unsubscribe();
        assert!(feed.publish(item(json!({"high": 3}))).is_none());
    }

    #[test]
    fn test_connect_pulls_changes_made_while_hidden() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);
        let mut feed = DataFeed::new();
        feed.set_peer(true);

        // Published while nobody is subscribed
        assert_eq!(
            reconciler.on_published(&mut feed, item(json!({"weather_id": 600, "high": -1.5}))),
            None
        );
        assert_eq!(cell.get(), WeatherSnapshot::placeholder());

        let snapshot = reconciler.on_link(&mut feed, LinkCommand::Connect).unwrap();
        assert_eq!((snapshot.condition, snapshot.high), (600, -1));
        assert_eq!(cell.get(), snapshot);

        let live = reconciler
            .on_published(&mut feed, item(json!({"low": -7})))
            .unwrap();
        assert_eq!((live.condition, live.low, live.high), (600, -7, -1));

        reconciler.on_link(&mut feed, LinkCommand::Disconnect);
        assert!(!feed.is_subscribed());
    }

    #[test]
    fn test_failed_connect_keeps_snapshot() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::new(WeatherSnapshot::new(3, 1, 801));
        let reconciler = Reconciler::new(&cell);
        let mut feed = DataFeed::new();

        assert_eq!(reconciler.on_link(&mut feed, LinkCommand::Connect), None);
        assert!(!feed.is_subscribed());
        assert_eq!(cell.get(), WeatherSnapshot::new(3, 1, 801));
    }

    #[test]
    fn test_handheld_connecting_after_connect_request_subscribes() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);
        let mut feed = DataFeed::new();

        // Face visible before any handheld is around
        assert_eq!(reconciler.on_link(&mut feed, LinkCommand::Connect), None);
        assert!(feed.is_wanted());

        assert_eq!(reconciler.on_peer(&mut feed, true), None);
        assert!(feed.is_subscribed());

        let snapshot = reconciler
            .on_published(&mut feed, item(json!({"weather_id": 500, "low": 5.4, "high": 21.6})))
            .unwrap();
        assert_eq!((snapshot.condition, snapshot.low, snapshot.high), (500, 5, 22));
        assert_eq!(cell.get(), snapshot);
    }

    #[test]
    fn test_handheld_reconnect_follows_link_request() {
        let cell: WeatherCell<NoopRawMutex> = WeatherCell::default();
        let reconciler = Reconciler::new(&cell);
        let mut feed = DataFeed::new();
        reconciler.on_peer(&mut feed, true);
        reconciler.on_link(&mut feed, LinkCommand::Connect);
        assert!(feed.is_subscribed());

        // Dropped link resumes on reconnect and pulls what is stored
        reconciler.on_peer(&mut feed, false);
        assert!(!feed.is_subscribed());
        reconciler.on_published(&mut feed, item(json!({"high": 12})));
        let snapshot = reconciler.on_peer(&mut feed, true).unwrap();
        assert_eq!(snapshot.high, 12);

        // Hidden face stays unsubscribed when the handheld returns
        reconciler.on_link(&mut feed, LinkCommand::Disconnect);
        reconciler.on_peer(&mut feed, false);
        assert_eq!(reconciler.on_peer(&mut feed, true), None);
        assert!(!feed.is_subscribed());
    }
}

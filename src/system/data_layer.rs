//! Data layer task
//!
//! Owns the store of data items written by the phone and applies weather
//! items to the shared snapshot while the face is subscribed.

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use sunshine_face::{DataFeed, FaceEvent, Reconciler, WeatherCell};

use crate::{DATA_ITEMS, FACE_EVENTS, LINK, PEER};

#[embassy_executor::task]
pub async fn data_layer_task(weather: &'static WeatherCell<ThreadModeRawMutex>) -> ! {
    let reconciler = Reconciler::new(weather);
    let mut feed = DataFeed::new();

    loop {
        let applied = match select3(LINK.wait(), DATA_ITEMS.receive(), PEER.wait()).await {
            Either3::First(command) => reconciler.on_link(&mut feed, command),
            Either3::Second(item) => reconciler.on_published(&mut feed, item),
            Either3::Third(connected) => reconciler.on_peer(&mut feed, connected),
        };

        if applied.is_some() {
            FACE_EVENTS.send(FaceEvent::WeatherUpdated).await;
        }
    }
}

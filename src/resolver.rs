//! Figure out where we are, then what the UV index is there. Both lookups
//! happen exactly once, in a background thread, and are never retried.

use crate::{
    app::Event,
    location::LocationService,
    uv::{UvReading, UvSource},
};
use log::{debug, error, info};
use std::{
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
};

/// Spawn the lookup thread. Results come back as [Event]s on `sink`. If the
/// receiving end is gone by the time a result lands, it's dropped on the
/// floor.
pub fn spawn(
    location: Box<dyn LocationService>,
    uv: Box<dyn UvSource>,
    sink: Sender<Event>,
) -> JoinHandle<()> {
    thread::spawn(move || resolve(location.as_ref(), uv.as_ref(), &sink))
}

/// Run both lookups, in order, on the current thread
fn resolve(
    location: &dyn LocationService,
    uv: &dyn UvSource,
    sink: &Sender<Event>,
) {
    info!("Requesting position from {}", location.name());
    let position = location.current_position();
    let coordinates = match &position {
        Ok(coordinates) => {
            info!("Position resolved to {coordinates}");
            Some(*coordinates)
        }
        Err(err) => {
            error!("{}", err.user_message());
            None
        }
    };
    if !deliver(sink, Event::Position(position)) {
        return;
    }

    // No position, no UV fetch
    if let Some(coordinates) = coordinates {
        let reading = UvReading::from(uv.fetch(coordinates));
        info!("UV reading: {reading}");
        deliver(sink, Event::Uv(reading));
    }
}

/// Hand an event to the app. Returns false if the app has been torn down
fn deliver(sink: &Sender<Event>, event: Event) -> bool {
    match sink.send(event) {
        Ok(()) => true,
        Err(err) => {
            debug!("App is gone, discarding {:?}", err.0);
            false
        }
    }
}

//! All session state lives here, and only changes in response to an [Event]

use crate::{
    location::{Coordinates, LocationError},
    policy::{self, Advice, SkinType},
    timer::{Countdown, TickOutcome, Ticker, Toggle},
    uv::UvReading,
};
use anyhow::{anyhow, bail};
use log::{debug, info, trace, warn};
use std::{str::FromStr, sync::mpsc::Sender};

/// Something happened that the app needs to react to
#[derive(Debug, PartialEq)]
pub enum Event {
    /// The one and only position lookup finished
    Position(Result<Coordinates, LocationError>),
    /// The one and only UV fetch finished
    Uv(UvReading),
    /// One second passed, for the countdown run with this generation
    Tick(u64),
    Command(Command),
    /// Ctrl-C
    Quit,
}

/// User input, one per line
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    /// The action button: stop when running, resume when stopped, otherwise
    /// start fresh
    Toggle,
    /// Always a fresh countdown, even over a running or stopped one
    Start,
    Stop,
    Skin(SkinType),
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = match words.next() {
            None | Some("t" | "toggle") => Self::Toggle,
            Some("start") => Self::Start,
            Some("stop") => Self::Stop,
            Some("skin") => {
                let skin = words
                    .next()
                    .ok_or_else(|| anyhow!("Missing skin type"))?
                    .parse()?;
                Self::Skin(skin)
            }
            Some("q" | "quit") => Self::Quit,
            Some(other) => bail!("Unknown command `{other}`"),
        };
        Ok(command)
    }
}

/// Should the event loop keep going?
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Session state. Owns the ticker, so tearing this down always stops the
/// countdown from firing.
#[derive(Debug)]
pub struct App {
    skin: SkinType,
    coordinates: Option<Coordinates>,
    location_error: Option<LocationError>,
    uv: Option<UvReading>,
    timer: Countdown,
    ticker: Option<Ticker>,
    /// Bumped for every countdown run, so ticks from a cancelled ticker that
    /// were already queued can be told apart
    generation: u64,
    events: Sender<Event>,
}

impl App {
    /// `events` is where the ticker posts its ticks; it should feed back into
    /// [Self::handle]
    pub fn new(skin: SkinType, events: Sender<Event>) -> Self {
        Self {
            skin,
            coordinates: None,
            location_error: None,
            uv: None,
            timer: Countdown::default(),
            ticker: None,
            generation: 0,
            events,
        }
    }

    pub fn skin(&self) -> SkinType {
        self.skin
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn location_error(&self) -> Option<&LocationError> {
        self.location_error.as_ref()
    }

    pub fn uv(&self) -> Option<&UvReading> {
        self.uv.as_ref()
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn advice(&self) -> Advice {
        Advice::new(self.uv.as_ref(), self.skin)
    }

    /// Exposure window for the current reading and skin type
    pub fn exposure_minutes(&self) -> Option<u32> {
        policy::exposure_for(self.uv.as_ref(), self.skin)
    }

    /// Is there a live ticker right now?
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_cancelled())
    }

    pub fn handle(&mut self, event: Event) -> Flow {
        trace!("Handling event {event:?}");
        match event {
            Event::Position(Ok(coordinates)) => {
                self.coordinates = Some(coordinates);
                self.location_error = None;
            }
            Event::Position(Err(err)) => self.location_error = Some(err),
            // A running countdown keeps the duration it started with
            Event::Uv(reading) => self.uv = Some(reading),
            Event::Tick(generation) => self.on_tick(generation),
            Event::Command(command) => return self.on_command(command),
            Event::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn on_tick(&mut self, generation: u64) {
        if generation != self.generation || !self.is_ticking() {
            debug!("Ignoring stale tick from generation {generation}");
            return;
        }
        if self.timer.tick() == TickOutcome::Expired {
            info!("Exposure time is up");
            self.cancel_ticker();
        }
    }

    fn on_command(&mut self, command: Command) -> Flow {
        let minutes = self.exposure_minutes();
        match command {
            Command::Toggle => match self.timer.toggle(minutes) {
                // A resumed run still gets its own generation of ticks
                Toggle::Started | Toggle::Resumed => self.start_ticker(),
                Toggle::Stopped => self.cancel_ticker(),
                Toggle::Rejected => {
                    warn!("No exposure window for the current UV index")
                }
            },
            Command::Start => {
                if self.timer.start(minutes) {
                    self.start_ticker();
                } else {
                    warn!("No exposure window for the current UV index");
                }
            }
            Command::Stop => {
                if self.timer.stop() {
                    self.cancel_ticker();
                }
            }
            Command::Skin(skin) => {
                info!("Skin type set to {skin}");
                self.skin = skin;
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Replace any existing ticker with a fresh one for a new run
    fn start_ticker(&mut self) {
        self.cancel_ticker();
        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        self.ticker = Some(Ticker::spawn(Ticker::INTERVAL, move || {
            events.send(Event::Tick(generation)).is_ok()
        }));
    }

    fn cancel_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        info!("Shutting down");
        self.cancel_ticker();
    }
}

mod app;
mod config;
mod display;
mod location;
mod policy;
mod resolver;
mod timer;
mod uv;

use crate::{
    app::{App, Command, Event, Flow},
    config::Config,
    display::Display,
    location::{FixedLocation, IpLocation, LocationService},
    uv::UvClient,
};
use anyhow::Context;
use log::{info, warn, LevelFilter};
use std::{
    io::{self, BufRead, IsTerminal},
    sync::mpsc::{self, Sender},
    thread,
};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("sunscreen", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load()?;
    let (events, receiver) = mpsc::channel();

    let quit = events.clone();
    ctrlc::set_handler(move || {
        let _ = quit.send(Event::Quit);
    })
    .context("Error setting termination handler")?;

    let agent = ureq::AgentBuilder::new()
        .timeout(config.request_timeout())
        .user_agent(concat!("sunscreen/", env!("CARGO_PKG_VERSION")))
        .build();
    let location: Box<dyn LocationService> = match config.location {
        Some(coordinates) => Box::new(FixedLocation(coordinates)),
        None => Box::new(IpLocation::new(
            agent.clone(),
            &config.location_api_url,
        )),
    };
    let uv = Box::new(UvClient::new(
        agent,
        &config.uv_api_url,
        config.api_key(),
    ));
    resolver::spawn(location, uv, events.clone());
    read_commands(events.clone());

    let stdout = io::stdout();
    let clear_screen = stdout.is_terminal();
    let mut display = Display::new(stdout, clear_screen);
    let mut app = App::new(config.skin_type, events);
    display.draw(&app)?;

    loop {
        let event = receiver.recv().context("Event channel closed")?;
        if app.handle(event) == Flow::Quit {
            break;
        }
        display.draw(&app)?;
    }

    info!("Goodbye");
    Ok(())
}

/// Spawn a thread that turns stdin lines into commands
fn read_commands(events: Sender<Event>) {
    let stdin = io::stdin();
    let quit_on_eof = stdin.is_terminal();
    thread::spawn(move || forward_commands(stdin.lock(), quit_on_eof, &events));
}

/// Forward each parseable line as a command until input runs out. Hitting
/// the end of an interactive terminal (Ctrl-D) means quit; running out of
/// piped or absent input just leaves Ctrl-C as the way out.
fn forward_commands(
    input: impl BufRead,
    quit_on_eof: bool,
    events: &Sender<Event>,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("Error reading input: {err}");
                break;
            }
        };
        match line.parse::<Command>() {
            Ok(command) => {
                if events.send(Event::Command(command)).is_err() {
                    return;
                }
            }
            Err(err) => warn!("{err}"),
        }
    }
    if quit_on_eof {
        let _ = events.send(Event::Command(Command::Quit));
    } else {
        info!("End of input, no more commands will be read");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SkinType;
    use std::io::Cursor;

    fn forward(input: &str, quit_on_eof: bool) -> Vec<Event> {
        let (tx, rx) = mpsc::channel();
        forward_commands(Cursor::new(input.to_owned()), quit_on_eof, &tx);
        drop(tx);
        rx.iter().collect()
    }

    #[test]
    fn test_forward_commands() {
        assert_eq!(
            forward("start\ndance\nskin light\n\n", false),
            vec![
                Event::Command(Command::Start),
                Event::Command(Command::Skin(SkinType::Light)),
                Event::Command(Command::Toggle),
            ]
        );
    }

    #[test]
    fn test_eof_quits_only_on_terminal() {
        assert_eq!(forward("", false), vec![]);
        assert_eq!(forward("", true), vec![Event::Command(Command::Quit)]);
        assert_eq!(
            forward("stop\n", true),
            vec![
                Event::Command(Command::Stop),
                Event::Command(Command::Quit)
            ]
        );
    }
}

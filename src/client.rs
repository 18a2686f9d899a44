// Observer side of the websocket: feeds snapshots into an `ObserverSession`
// and forwards driver commands to the simulator.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::{ClientError, CommandError};
use crate::layout::WidgetId;
use crate::observer::{ObserverSession, RenderSurface};
use crate::state::{ControlAction, ControlEvent, ServerMessage};

// ---------------------------------------------
// Driver commands (one per stdin line)
// ---------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Control(ControlEvent),
    Customize,
    Done,
    Move { id: WidgetId, index: usize },
    Layout,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();

        if let Some(action) = ControlAction::parse(head) {
            const USAGE: &str = "<accelerate|brake|reverse> <on|off>";
            let active = match words.next() {
                Some("on" | "true" | "1") => true,
                Some("off" | "false" | "0") => false,
                _ => return Err(CommandError::Usage(USAGE)),
            };
            return Ok(Command::Control(ControlEvent { action, active }));
        }

        match head {
            "customize" => Ok(Command::Customize),
            "done" => Ok(Command::Done),
            "layout" => Ok(Command::Layout),
            "move" => {
                const USAGE: &str = "move <widget> <index>";
                let id = words.next().ok_or(CommandError::Usage(USAGE))?;
                let index = words
                    .next()
                    .and_then(|i| i.parse().ok())
                    .ok_or(CommandError::Usage(USAGE))?;
                Ok(Command::Move { id: id.into(), index })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Connect to the simulator and run until it hangs up.
pub async fn run_observer<S: RenderSurface>(
    url: &str,
    session: &mut ObserverSession,
    surface: &mut S,
    mut commands: UnboundedReceiver<Command>,
) -> Result<(), ClientError> {
    let (ws, _) = connect_async(url).await.map_err(|source| ClientError::Connect {
        url: url.to_string(),
        source,
    })?;
    let (mut write, mut read) = ws.split();
    info!(url, "connected to simulator");

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => on_server_text(&text, session, surface),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            Some(command) = commands.recv() => {
                if let Some(event) = apply_command(command, session, surface) {
                    let text = serde_json::to_string(&event).unwrap_or_default();
                    write.send(Message::Text(text)).await?;
                }
            }
        }
    }

    info!("simulator closed the connection");
    Ok(())
}

fn on_server_text<S: RenderSurface>(text: &str, session: &mut ObserverSession, surface: &mut S) {
    let msg = match serde_json::from_str::<ServerMessage>(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "ignored server frame");
            return;
        }
    };

    match msg {
        ServerMessage::Welcome { observer_id } => info!(%observer_id, "registered as observer"),
        ServerMessage::Pong => debug!("pong"),
        ServerMessage::CarSignal(snapshot) => {
            let Some(update) = session.on_snapshot(snapshot) else {
                return;
            };
            if update.mode_changed {
                info!(mode = %update.mode, speed = snapshot.speed, "driver mode changed");
            }
            if update.editing_revoked {
                info!("vehicle moving, customization locked");
            }
            session.render(surface);
        }
    }
}

/// Local commands are applied here; control events are returned for sending.
fn apply_command<S: RenderSurface>(
    command: Command,
    session: &mut ObserverSession,
    surface: &mut S,
) -> Option<ControlEvent> {
    match command {
        Command::Control(event) => return Some(event),
        Command::Customize => {
            if !session.customize() {
                warn!(mode = %session.mode(), "customize is only available while parked");
            }
        }
        Command::Done => session.done(),
        Command::Move { id, index } => {
            if let Err(e) = session.move_widget(&id, index) {
                warn!(error = %e, "move refused");
            }
        }
        Command::Layout => session.invalidate(),
    }
    session.render(surface);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutPolicy;
    use crate::mode::{DriverMode, ModeThresholds};
    use crate::observer::Frame;
    use crate::state::Snapshot;
    use crate::vehicle::Gear;

    #[derive(Default)]
    struct Count {
        draws: usize,
        layouts: usize,
        last_speed: f32,
    }

    impl RenderSurface for Count {
        fn draw(&mut self, frame: &Frame<'_>) {
            self.draws += 1;
            self.layouts += usize::from(frame.layout_changed);
            self.last_speed = frame.snapshot.speed;
        }
    }

    fn signal(tick: u64, speed: f32) -> String {
        ServerMessage::CarSignal(Snapshot { tick, speed, rpm: 900.0, gear: Gear::Drive, temp: 90.0, fuel: 75.0 })
            .to_json()
    }

    #[test]
    fn parses_driver_commands() {
        let accel = ControlEvent { action: ControlAction::Accelerate, active: true };
        assert_eq!(Command::parse("accelerate on"), Ok(Command::Control(accel)));
        assert_eq!(
            Command::parse("  brake   off "),
            Ok(Command::Control(ControlEvent { action: ControlAction::Brake, active: false }))
        );
        assert_eq!(Command::parse("customize"), Ok(Command::Customize));
        assert_eq!(Command::parse("done"), Ok(Command::Done));
        assert_eq!(
            Command::parse("move map 0"),
            Ok(Command::Move { id: "map".into(), index: 0 })
        );
    }

    #[test]
    fn rejects_bad_command_lines() {
        assert!(matches!(Command::parse("reverse maybe"), Err(CommandError::Usage(_))));
        assert!(matches!(Command::parse("move map"), Err(CommandError::Usage(_))));
        assert!(matches!(Command::parse("move map -1"), Err(CommandError::Usage(_))));
        assert_eq!(Command::parse("honk"), Err(CommandError::Unknown("honk".into())));
        assert_eq!(Command::parse(""), Err(CommandError::Unknown(String::new())));
    }

    #[test]
    fn control_event_wire_shape() {
        let event = ControlEvent { action: ControlAction::Reverse, active: true };
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"{"action":"reverse","active":true}"#);
    }

    #[test]
    fn server_frames_drive_the_session() {
        let mut session = ObserverSession::new(LayoutPolicy::default(), ModeThresholds::default());
        let mut surface = Count::default();

        on_server_text(r#"{"type":"welcome","observer_id":"abc"}"#, &mut session, &mut surface);
        on_server_text("garbage", &mut session, &mut surface);
        assert!(session.last_snapshot().is_none());

        assert_eq!(surface.draws, 0);

        on_server_text(&signal(1, 0.0), &mut session, &mut surface);
        assert_eq!(session.mode(), DriverMode::Parked);
        assert_eq!((surface.draws, surface.layouts), (1, 1));

        on_server_text(&signal(2, 100.0), &mut session, &mut surface);
        assert_eq!(session.mode(), DriverMode::Highway);
        assert_eq!((surface.draws, surface.layouts), (2, 2));

        // stale frame: nothing applied, nothing drawn
        on_server_text(&signal(2, 0.0), &mut session, &mut surface);
        assert_eq!(surface.draws, 2);
    }

    #[test]
    fn pulling_away_redraws_every_snapshot() {
        let mut session = ObserverSession::new(LayoutPolicy::default(), ModeThresholds::default());
        let mut surface = Count::default();

        on_server_text(&signal(1, 0.0), &mut session, &mut surface);
        for tick in 2..50 {
            on_server_text(&signal(tick, tick as f32), &mut session, &mut surface);
        }

        assert_eq!(session.mode(), DriverMode::City);
        assert_eq!(surface.draws, 49);
        // parked and city resolve to the same widgets
        assert_eq!(surface.layouts, 1);
        assert_eq!(surface.last_speed, 49.0);
    }

    #[test]
    fn layout_command_forces_a_full_redraw() {
        let mut session = ObserverSession::new(LayoutPolicy::default(), ModeThresholds::default());
        let mut surface = Count::default();
        on_server_text(&signal(1, 0.0), &mut session, &mut surface);

        apply_command(Command::Done, &mut session, &mut surface);
        assert_eq!((surface.draws, surface.layouts), (2, 1));

        apply_command(Command::Layout, &mut session, &mut surface);
        assert_eq!((surface.draws, surface.layouts), (3, 2));
    }

    #[test]
    fn local_commands_stay_local() {
        let mut session = ObserverSession::new(LayoutPolicy::default(), ModeThresholds::default());
        let mut surface = Count::default();
        on_server_text(&signal(1, 0.0), &mut session, &mut surface);

        assert_eq!(apply_command(Command::Customize, &mut session, &mut surface), None);
        assert!(session.editing());
        apply_command(Command::Move { id: "status".into(), index: 0 }, &mut session, &mut surface);
        assert_eq!(session.order()[0], WidgetId::from("status"));

        let event = ControlEvent { action: ControlAction::Accelerate, active: true };
        assert_eq!(apply_command(Command::Control(event), &mut session, &mut surface), Some(event));
    }
}
